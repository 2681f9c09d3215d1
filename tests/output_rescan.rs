// tests/output_rescan.rs

//! Committed outputs are rescanned: a generated file can itself be the
//! source of further actions.

use std::error::Error;
use std::sync::Arc;

use forage::{Driver, DriverOptions, TaskState};
use forage_test_utils::{init_tracing, mock_tree, with_timeout, RecordingDashboard, ScriptedFactory, Step};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn generated_output_is_offered_to_factories() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_fs, src, tmp) = mock_tree(&[("d.src", "")]);
        let dashboard = RecordingDashboard::new();

        let generator = Arc::new(ScriptedFactory::new(
            "generate",
            "d.src",
            vec![Step::new_output("gen.h"), Step::Succeed],
        ));
        let header_user = Arc::new(ScriptedFactory::new(
            "scan-header",
            ".h",
            vec![Step::Log("indexing header\n".to_string()), Step::Succeed],
        ));

        let mut driver = Driver::new(
            Arc::new(dashboard.clone()),
            src,
            tmp,
            DriverOptions {
                max_concurrent_actions: 1,
                exit_when_idle: true,
            },
        );
        driver.add_factory("generator", generator);
        driver.add_factory("header-user", header_user.clone());

        driver.run().await?;

        // The output was offered to the factories as a fresh source file.
        assert_eq!(header_user.invocations(), vec!["scan:tmp/gen.h"]);

        let header_task = dashboard.find("gen.h").expect("task for generated header");
        assert_eq!(header_task.verb, "scan-header");
        assert_eq!(header_task.last_state(), Some(TaskState::Done));

        Ok(())
    })
    .await
}

#[tokio::test]
async fn rolled_back_outputs_are_not_rescanned() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_fs, src, tmp) = mock_tree(&[("e.src", "")]);
        let dashboard = RecordingDashboard::new();

        // Creates an output, then discovers a missing dependency and fails:
        // the rollback must discard the staged output.
        let generator = Arc::new(ScriptedFactory::new(
            "generate",
            "e.src",
            vec![
                Step::new_output("x.h"),
                Step::find("entity:missing", "m"),
                Step::Fail,
            ],
        ));
        let header_user = Arc::new(ScriptedFactory::new("scan-header", ".h", vec![Step::Succeed]));

        let mut driver = Driver::new(
            Arc::new(dashboard.clone()),
            src,
            tmp,
            DriverOptions {
                max_concurrent_actions: 1,
                exit_when_idle: true,
            },
        );
        driver.add_factory("generator", generator);
        driver.add_factory("header-user", header_user.clone());

        driver.run().await?;

        assert!(header_user.invocations().is_empty());
        assert!(dashboard.find("x.h").is_none());

        // Rolled back, then reported failed at shutdown since nothing could
        // ever provide the missing entity.
        let gen = dashboard.find("e.src").expect("task for e.src");
        assert_eq!(
            gen.states(),
            vec![
                TaskState::Pending,
                TaskState::Running,
                TaskState::Blocked,
                TaskState::Failed,
            ]
        );
        assert!(gen.output().contains("still waiting for: m"));

        Ok(())
    })
    .await
}
