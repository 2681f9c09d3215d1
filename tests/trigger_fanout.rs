// tests/trigger_fanout.rs

//! Trigger dispatch: factories subscribed to an entity are offered the
//! providing file when the entity is committed, exactly once per publish.

use std::error::Error;
use std::sync::Arc;

use forage::{Driver, DriverOptions, TaskState};
use forage_test_utils::{init_tracing, mock_tree, with_timeout, RecordingDashboard, ScriptedFactory, Step};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn committing_an_entity_fires_subscribed_factories() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_fs, src, tmp) = mock_tree(&[("c.src", "")]);
        let dashboard = RecordingDashboard::new();

        let archiver = Arc::new(ScriptedFactory::new(
            "archive",
            "c.src",
            vec![
                Step::new_output("c.a"),
                Step::provide_output(0, &["lib:c"]),
                Step::Succeed,
            ],
        ));
        // Never matches a scanned file; only reacts to the trigger.
        let linker = Arc::new(
            ScriptedFactory::new("link", ".never", vec![]).with_trigger(
                "lib:c",
                vec![Step::Log("linking against c\n".to_string()), Step::Succeed],
            ),
        );
        // Subscribed but declines to make an action; must still be offered
        // the pair exactly once.
        let observer = Arc::new(
            ScriptedFactory::new("observe", ".never", vec![]).with_trigger("lib:c", vec![]),
        );

        let mut driver = Driver::new(
            Arc::new(dashboard.clone()),
            src,
            tmp,
            DriverOptions {
                max_concurrent_actions: 2,
                exit_when_idle: true,
            },
        );
        driver.add_factory("archiver", archiver);
        driver.add_factory("linker", linker.clone());
        driver.add_factory("observer", observer.clone());

        driver.run().await?;

        // The triggered action runs against the providing file, which serves
        // as both source and tmp location.
        assert_eq!(linker.invocations(), vec!["trigger:lib:c@tmp/c.a"]);
        assert_eq!(observer.invocations(), vec!["trigger:lib:c@tmp/c.a"]);

        let link_task = dashboard
            .tasks()
            .into_iter()
            .find(|t| t.verb == "link")
            .expect("triggered link task");
        assert_eq!(link_task.name, "tmp/c.a");
        assert_eq!(link_task.last_state(), Some(TaskState::Done));
        assert!(link_task.output().contains("linking against c"));

        // The observer declined, so no task was created for it.
        assert!(dashboard.tasks().iter().all(|t| t.verb != "observe"));

        Ok(())
    })
    .await
}
