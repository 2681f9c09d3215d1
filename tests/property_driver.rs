// tests/property_driver.rs

//! Property tests driving the core through random provide/require graphs.
//!
//! Action `i` provides entity `e<i>` and may require any entities of
//! lower-numbered actions, so the graph is acyclic by construction. The
//! simulation fabricates completion reports the way running actions would:
//! requirements absent from the entity index at completion time are reported
//! missing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use forage::driver::{CompletionReport, CoreCommand, DriverCore, Provision, StartOrder};
use forage::{ActionOutcome, DriverEvent, DriverOptions, EntityId, TaskState};
use forage_test_utils::{mock_tree, RecordingDashboard, ScriptedAction};

#[derive(Debug, Clone)]
struct Plan {
    /// requires[i] = indices j < i whose entity action i needs.
    requires: Vec<Vec<usize>>,
    failing: HashSet<usize>,
    max_concurrent: usize,
}

fn plan_strategy(max_actions: usize) -> impl Strategy<Value = Plan> {
    (1..=max_actions).prop_flat_map(move |n| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..max_actions),
            n,
        );
        let failing = proptest::collection::vec(0..n, 0..3);
        let max_concurrent = 1..4usize;
        (deps, failing, max_concurrent).prop_map(move |(raw_deps, failing, max_concurrent)| {
            let requires = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut deps: Vec<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .collect();
                    deps.sort();
                    deps
                })
                .collect();
            Plan {
                requires,
                failing: failing.into_iter().collect(),
                max_concurrent,
            }
        })
    })
}

fn entity(i: usize) -> EntityId {
    EntityId::new(format!("artifact:{i}"))
}

/// Which actions can ever commit: those none of whose transitive
/// requirements fail.
fn eventually_committed(plan: &Plan) -> Vec<bool> {
    let n = plan.requires.len();
    let mut committed = vec![false; n];
    for i in 0..n {
        committed[i] =
            !plan.failing.contains(&i) && plan.requires[i].iter().all(|&j| committed[j]);
    }
    committed
}

proptest! {
    #[test]
    fn random_graphs_settle_with_consistent_state(plan in plan_strategy(10)) {
        let n = plan.requires.len();
        let dashboard = RecordingDashboard::new();
        let (_fs, src, tmp) = mock_tree(&[]);
        let mut core = DriverCore::new(
            Arc::new(dashboard.clone()),
            src.clone(),
            tmp,
            DriverOptions {
                max_concurrent_actions: plan.max_concurrent,
                exit_when_idle: true,
            },
        );

        for i in 0..n {
            core.queue_new_action(
                ScriptedAction::boxed("build", vec![]),
                &src.relative(&format!("a{i}.src")),
                &src.relative(&format!("a{i}.src")),
            );
        }

        let mut running: Vec<StartOrder> = core.start_some_actions();
        let mut steps = 0;
        let max_steps = 10 * n + 10;

        while let Some(order) = running.pop() {
            steps += 1;
            prop_assert!(steps <= max_steps, "simulation did not settle");
            prop_assert!(core.active_count() <= plan.max_concurrent);

            let i = order.id.as_u64() as usize;
            let reader = core.entity_reader();
            let missing: HashMap<EntityId, String> = plan.requires[i]
                .iter()
                .map(|&j| entity(j))
                .filter(|e| !reader.contains(e))
                .map(|e| (e.clone(), e.to_string()))
                .collect();

            let report = if !missing.is_empty() {
                CompletionReport {
                    outcome: ActionOutcome::Failed,
                    missing,
                    provisions: Vec::new(),
                    outputs: Vec::new(),
                }
            } else if plan.failing.contains(&i) {
                CompletionReport {
                    outcome: ActionOutcome::Failed,
                    missing: HashMap::new(),
                    provisions: Vec::new(),
                    outputs: Vec::new(),
                }
            } else {
                CompletionReport {
                    outcome: ActionOutcome::Succeeded,
                    missing: HashMap::new(),
                    provisions: vec![Provision {
                        file: src.relative(&format!("a{i}.out")),
                        entities: vec![entity(i)],
                    }],
                    outputs: Vec::new(),
                }
            };

            let step = core.step(DriverEvent::ActionDone {
                id: order.id,
                action: order.action,
                report,
            });
            for command in step.commands {
                let CoreCommand::StartActions(orders) = command;
                running.extend(orders);
            }
            prop_assert!(core.active_count() <= plan.max_concurrent);

            if !step.keep_running {
                break;
            }
        }

        // Settled: nothing pending or active, and the core failed whatever
        // was still blocked.
        prop_assert!(core.is_quiescent());
        prop_assert_eq!(core.blocked_count(), 0);

        // Every task reached a terminal state matching the plan.
        let committed = eventually_committed(&plan);
        let tasks = dashboard.tasks();
        prop_assert_eq!(tasks.len(), n);
        for (i, task) in tasks.iter().enumerate() {
            let expected = if committed[i] {
                TaskState::Done
            } else {
                TaskState::Failed
            };
            prop_assert_eq!(
                task.last_state(),
                Some(expected),
                "task {} ({:?}) ended in {:?}",
                i,
                plan.requires[i],
                task.last_state()
            );
            prop_assert_eq!(core.entity_reader().contains(&entity(i)), committed[i]);
        }
    }
}
