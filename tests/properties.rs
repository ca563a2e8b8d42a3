use std::fs;
use std::path::PathBuf;

use devbootstrap::config::BuildSettings;
use devbootstrap::env::merge_path;
use devbootstrap::{ProgressSink, ScriptLocator};
use proptest::prelude::*;

fn path_entry() -> impl Strategy<Value = String> {
    "/[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}"
}

fn locator() -> ScriptLocator {
    ScriptLocator::new(&BuildSettings {
        script_name: "build.sh".to_string(),
        ..BuildSettings::default()
    })
}

/// `depth` nested plain directories below `base`
fn nested(base: &std::path::Path, depth: usize) -> PathBuf {
    let mut dir = base.to_path_buf();
    for i in 0..depth {
        dir = dir.join(format!("d{i}"));
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

proptest! {
    #[test]
    fn merging_a_contained_entry_is_a_no_op(
        entries in prop::collection::vec(path_entry(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let current = entries.join(":");
        let entry = pick.get(&entries);
        prop_assert_eq!(merge_path(&current, entry, ':'), None);
    }

    #[test]
    fn merging_twice_equals_merging_once(
        entries in prop::collection::vec(path_entry(), 0..6),
        entry in path_entry(),
    ) {
        let current = entries.join(":");
        let once = merge_path(&current, &entry, ':').unwrap_or_else(|| current.clone());
        prop_assert_eq!(merge_path(&once, &entry, ':'), None);
        prop_assert!(once.contains(&entry));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn search_never_leaves_a_marked_root(depth in 1usize..5, use_git in any::<bool>()) {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("outer");
        let root = outer.join("repo");
        fs::create_dir_all(&root).unwrap();
        if use_git {
            fs::create_dir(root.join(".git")).unwrap();
        } else {
            fs::write(root.join("CMakeLists.txt"), "").unwrap();
        }
        fs::write(outer.join("build.sh"), "").unwrap();
        let start = nested(&root, depth);

        let found = locator().locate(&start, &ProgressSink::silent()).unwrap();

        prop_assert_eq!(found, None);
    }

    #[test]
    fn script_at_unmarked_ancestor_is_found(depth in 0usize..5) {
        let dir = tempfile::tempdir().unwrap();
        let ancestor = dir.path().join("project");
        fs::create_dir_all(&ancestor).unwrap();
        fs::write(ancestor.join("build.sh"), "").unwrap();
        let start = nested(&ancestor, depth);

        let found = locator().locate(&start, &ProgressSink::silent()).unwrap();

        prop_assert_eq!(found, Some(ancestor.canonicalize().unwrap().join("build.sh")));
    }
}
