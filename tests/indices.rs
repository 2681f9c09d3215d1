// tests/indices.rs

//! Unit-level checks of the entity index, the blocking index and the trigger
//! registry.

use std::sync::Arc;

use forage::driver::{BlockingIndex, EntityIndex, TriggerRegistry};
use forage::{ActionFactory, EntityId, FileHandle, FileSystem};
use forage::fs::mock::MockFileSystem;
use forage_test_utils::{ScriptedFactory, Step};

fn handle(path: &str) -> FileHandle {
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    FileHandle::new(fs, path)
}

#[test]
fn publish_is_idempotent_and_last_writer_wins() {
    let mut index = EntityIndex::new();
    let id = EntityId::new("object:foo.o");

    assert!(index.lookup(&id).is_none());
    assert!(index.is_empty());

    let first = handle("out/foo.o");
    index.publish(id.clone(), first.clone());
    assert_eq!(index.lookup(&id), Some(first.clone()));
    assert_eq!(index.len(), 1);

    // Same provider again: nothing observable changes.
    index.publish(id.clone(), first.clone());
    assert_eq!(index.lookup(&id), Some(first));
    assert_eq!(index.len(), 1);

    // Different provider replaces the entry.
    let second = handle("out2/foo.o");
    index.publish(id.clone(), second.clone());
    assert_eq!(index.lookup(&id), Some(second));
    assert_eq!(index.len(), 1);
}

#[test]
fn blocking_buckets_drain_in_insertion_order() {
    let mut blocking = BlockingIndex::new();
    let lib = EntityId::new("lib:z");
    let hdr = EntityId::new("header:z.h");

    // Distinct ids minted by a scratch core; ActionId has no public
    // constructor.
    let ids = fabricate_action_ids(3);

    blocking.block(ids[1], [lib.clone(), hdr.clone()].iter());
    blocking.block(ids[0], [lib.clone()].iter());
    blocking.block(ids[2], [lib.clone()].iter());
    // Double registration is ignored.
    blocking.block(ids[1], [lib.clone()].iter());

    assert_eq!(blocking.waiter_count(&lib), 3);
    assert_eq!(blocking.waiter_count(&hdr), 1);

    let drained = blocking.on_entity_available(&lib);
    assert_eq!(drained, vec![ids[1], ids[0], ids[2]]);
    assert_eq!(blocking.waiter_count(&lib), 0);

    // The hdr bucket is untouched.
    assert_eq!(blocking.on_entity_available(&hdr), vec![ids[1]]);
    assert!(blocking.is_empty());
}

#[test]
fn registry_offers_subscribed_factories_in_registration_order() {
    let mut registry = TriggerRegistry::new();
    let lib = EntityId::new("lib:z");

    let first = Arc::new(ScriptedFactory::new("link", ".never", vec![]).with_trigger("lib:z", vec![Step::Succeed]));
    let second = Arc::new(ScriptedFactory::new("pack", ".never", vec![]).with_trigger("lib:z", vec![Step::Succeed]));
    let unrelated =
        Arc::new(ScriptedFactory::new("other", ".never", vec![]).with_trigger("lib:other", vec![]));

    registry.register(&(first.clone() as Arc<dyn ActionFactory>));
    registry.register(&(second.clone() as Arc<dyn ActionFactory>));
    registry.register(&(unrelated.clone() as Arc<dyn ActionFactory>));

    let matching = registry.matching(&lib);
    assert_eq!(matching.len(), 2);

    let file = handle("z.a");
    let verbs: Vec<String> = matching
        .iter()
        .filter_map(|f| f.try_make_triggered_action(&lib, &file))
        .map(|a| a.verb().to_string())
        .collect();
    assert_eq!(verbs, vec!["link", "pack"]);

    assert!(registry.matching(&EntityId::new("lib:unknown")).is_empty());
}

/// Distinct `ActionId`s obtained by queueing into a scratch core.
fn fabricate_action_ids(n: usize) -> Vec<forage::ActionId> {
    use forage::driver::DriverCore;
    use forage::DriverOptions;
    use forage_test_utils::{mock_tree, RecordingDashboard, ScriptedAction};

    let (_fs, src, tmp) = mock_tree(&[]);
    let mut core = DriverCore::new(
        Arc::new(RecordingDashboard::new()),
        src.clone(),
        tmp,
        DriverOptions::default(),
    );
    (0..n)
        .map(|i| {
            core.queue_new_action(
                ScriptedAction::boxed("scratch", vec![]),
                &src.relative(&format!("f{i}")),
                &src.relative(&format!("f{i}")),
            )
        })
        .collect()
}
