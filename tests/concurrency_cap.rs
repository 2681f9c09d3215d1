// tests/concurrency_cap.rs

//! The active set never exceeds `max_concurrent_actions`; excess actions
//! wait in the pending queue until a slot frees up.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use forage::{Driver, DriverEvent, DriverOptions, TaskState};
use forage_test_utils::{init_tracing, mock_tree, with_timeout, RecordingDashboard, ScriptedFactory, Step};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn at_most_two_actions_run_with_cap_two() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_fs, src, tmp) = mock_tree(&[
            ("w1.job", ""),
            ("w2.job", ""),
            ("w3.job", ""),
            ("w4.job", ""),
        ]);
        let dashboard = RecordingDashboard::new();

        // Each action parks on an event that never fires.
        let workers = Arc::new(ScriptedFactory::new(
            "work",
            ".job",
            vec![Step::WaitForever],
        ));

        let mut driver = Driver::new(
            Arc::new(dashboard.clone()),
            src,
            tmp,
            DriverOptions {
                max_concurrent_actions: 2,
                exit_when_idle: true,
            },
        );
        driver.add_factory("workers", workers);

        let shutdown = driver.event_sender();
        let run = tokio::spawn(driver.run());

        // Give the loop time to scan and fill its two slots.
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(dashboard.count_in_state(TaskState::Running), 2);
        assert_eq!(dashboard.count_in_state(TaskState::Pending), 2);

        // Still no progress: the running actions are parked forever.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(dashboard.count_in_state(TaskState::Running), 2);
        assert_eq!(dashboard.count_in_state(TaskState::Pending), 2);

        shutdown.send(DriverEvent::ShutdownRequested).await?;
        run.await??;

        Ok(())
    })
    .await
}

#[tokio::test]
async fn freed_slots_are_refilled_from_the_pending_queue() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_fs, src, tmp) = mock_tree(&[
            ("w1.job", ""),
            ("w2.job", ""),
            ("w3.job", ""),
            ("w4.job", ""),
        ]);
        let dashboard = RecordingDashboard::new();

        let workers = Arc::new(ScriptedFactory::new(
            "work",
            ".job",
            vec![Step::SleepMillis(10), Step::Succeed],
        ));

        let mut driver = Driver::new(
            Arc::new(dashboard.clone()),
            src,
            tmp,
            DriverOptions {
                max_concurrent_actions: 2,
                exit_when_idle: true,
            },
        );
        driver.add_factory("workers", workers);

        driver.run().await?;

        assert_eq!(dashboard.count_in_state(TaskState::Done), 4);

        Ok(())
    })
    .await
}
