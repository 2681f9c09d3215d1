// tests/scanner_discovery.rs

//! Discovery scanning: depth-first walk, tmp mirroring, factory order.

use std::error::Error;
use std::sync::Arc;

use forage::driver::DiscoveryScanner;
use forage::{ActionFactory, FileSystem};
use forage_test_utils::{init_tracing, mock_tree, ScriptedFactory, Step};

type TestResult = Result<(), Box<dyn Error>>;

fn factories(list: Vec<(&str, Arc<ScriptedFactory>)>) -> Vec<(String, Arc<dyn ActionFactory>)> {
    list.into_iter()
        .map(|(name, f)| (name.to_string(), f as Arc<dyn ActionFactory>))
        .collect()
}

#[test]
fn walk_is_depth_first_and_mirrors_directories() -> TestResult {
    init_tracing();

    let (fs, src, tmp) = mock_tree(&[
        ("deep/inner/x.c", ""),
        ("deep/y.c", ""),
        ("top.c", ""),
    ]);
    let all_c = Arc::new(ScriptedFactory::new("compile", ".c", vec![Step::Succeed]));
    let registered = factories(vec![("c", all_c)]);

    let scanner = DiscoveryScanner::new(&registered);
    let discovered = scanner.scan(&src, &tmp)?;

    // LIFO over sorted directory listings: the later sibling surfaces first,
    // directories are descended as they are popped.
    let sources: Vec<String> = discovered.iter().map(|d| d.src_file.display_name()).collect();
    assert_eq!(
        sources,
        vec!["src/top.c", "src/deep/y.c", "src/deep/inner/x.c"]
    );

    // Each action's tmp location mirrors its source location.
    let mirrors: Vec<String> = discovered
        .iter()
        .map(|d| d.tmp_location.display_name())
        .collect();
    assert_eq!(
        mirrors,
        vec!["tmp/top.c", "tmp/deep/y.c", "tmp/deep/inner/x.c"]
    );

    // Directory mirrors were created for every visited directory.
    assert!(fs.is_dir(std::path::Path::new("tmp")));
    assert!(fs.is_dir(std::path::Path::new("tmp/deep")));
    assert!(fs.is_dir(std::path::Path::new("tmp/deep/inner")));

    Ok(())
}

#[test]
fn factories_are_offered_each_file_in_registration_order() -> TestResult {
    init_tracing();

    let (_fs, src, tmp) = mock_tree(&[("a.c", "")]);
    let first = Arc::new(ScriptedFactory::new("compile", ".c", vec![Step::Succeed]));
    let second = Arc::new(ScriptedFactory::new("lint", ".c", vec![Step::Succeed]));
    let registered = factories(vec![("first", first), ("second", second)]);

    let scanner = DiscoveryScanner::new(&registered);
    let discovered = scanner.scan(&src, &tmp)?;

    let verbs: Vec<&str> = discovered.iter().map(|d| d.action.verb()).collect();
    assert_eq!(verbs, vec!["compile", "lint"]);

    Ok(())
}

#[test]
fn non_matching_files_produce_nothing() -> TestResult {
    init_tracing();

    let (_fs, src, tmp) = mock_tree(&[("README.md", "docs")]);
    let only_c = Arc::new(ScriptedFactory::new("compile", ".c", vec![Step::Succeed]));
    let registered = factories(vec![("c", only_c.clone())]);

    let scanner = DiscoveryScanner::new(&registered);
    let discovered = scanner.scan(&src, &tmp)?;

    assert!(discovered.is_empty());
    assert!(only_c.invocations().is_empty());

    Ok(())
}
