// Tests for batch reorganization of kept files

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use proptest::prelude::*;
use recup_cleaner::cleaner::rules::extension_of;
use recup_cleaner::cleaner::{CleanerError, Decision, FileEntry, Reorganizer};
use tempfile::TempDir;

use super::common::{make_folder, names_in};

fn kept_entry(root: &Path, folder_index: u64, name: &str) -> FileEntry {
    FileEntry {
        path: root.join(format!("recup_dir.{}", folder_index)).join(name),
        folder_index,
        extension: extension_of(name).unwrap_or_default(),
        decision: Decision::Keep,
        size: None,
    }
}

#[test]
fn test_twelve_hundred_files_make_three_batches() {
    let dir = TempDir::new().unwrap();
    let names: Vec<String> = (0..1200).map(|i| format!("f{:05}.jpg", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    make_folder(dir.path(), 1, &refs);
    let kept: Vec<FileEntry> = names.iter().map(|n| kept_entry(dir.path(), 1, n)).collect();

    let report = Reorganizer::new(dir.path(), 500).unwrap().run(&kept);

    assert_eq!(report.moved, 1200);
    assert_eq!(names_in(&dir.path().join("jpg")), vec!["1", "2", "3"]);
    assert_eq!(names_in(&dir.path().join("jpg/1")).len(), 500);
    assert_eq!(names_in(&dir.path().join("jpg/2")).len(), 500);
    assert_eq!(names_in(&dir.path().join("jpg/3")).len(), 200);
    assert!(!dir.path().join("recup_dir.1").exists());
    assert_eq!(report.removed_folders.len(), 1);
}

#[test]
fn test_files_grouped_by_simple_type() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &["a.jpg", "b.tar.gz", "README"]);
    let kept = vec![
        kept_entry(dir.path(), 1, "a.jpg"),
        kept_entry(dir.path(), 1, "b.tar.gz"),
        kept_entry(dir.path(), 1, "README"),
    ];

    let report = Reorganizer::new(dir.path(), 10).unwrap().run(&kept);

    assert_eq!(report.moved, 3);
    assert!(dir.path().join("jpg/1/a.jpg").exists());
    assert!(dir.path().join("gz/1/b.tar.gz").exists());
    assert!(dir.path().join("no_extension/1/README").exists());
}

#[test]
fn test_same_name_from_two_folders_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let first = make_folder(dir.path(), 1, &[]);
    let second = make_folder(dir.path(), 2, &[]);
    fs::write(first.join("f1.jpg"), b"from one").unwrap();
    fs::write(second.join("f1.jpg"), b"from two").unwrap();
    let kept = vec![
        kept_entry(dir.path(), 2, "f1.jpg"),
        kept_entry(dir.path(), 1, "f1.jpg"),
    ];

    let report = Reorganizer::new(dir.path(), 10).unwrap().run(&kept);

    assert_eq!(report.moved, 2);
    assert!(report.collisions.is_empty());
    let batch = dir.path().join("jpg/1");
    assert_eq!(fs::read(batch.join("f1.jpg")).unwrap(), b"from one");
    assert_eq!(fs::read(batch.join("2_f1.jpg")).unwrap(), b"from two");
}

#[test]
fn test_folder_with_leftovers_is_kept_and_reported() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &["keep.jpg", "stray.bin"]);
    make_folder(dir.path(), 2, &["other.jpg"]);
    let kept = vec![
        kept_entry(dir.path(), 1, "keep.jpg"),
        kept_entry(dir.path(), 2, "other.jpg"),
    ];

    let report = Reorganizer::new(dir.path(), 10).unwrap().run(&kept);

    assert_eq!(report.remaining_folders, vec![dir.path().join("recup_dir.1")]);
    assert!(dir.path().join("recup_dir.1/stray.bin").exists());
    assert!(!dir.path().join("recup_dir.2").exists());
}

#[test]
fn test_occupied_batch_folder_is_skipped_on_replan() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &["a.jpg", "b.jpg"]);
    let kept = vec![
        kept_entry(dir.path(), 1, "a.jpg"),
        kept_entry(dir.path(), 1, "b.jpg"),
    ];
    let reorganizer = Reorganizer::new(dir.path(), 10).unwrap();
    let plan = reorganizer.plan(&kept);
    // Something else grabs the destination between planning and moving.
    fs::create_dir_all(plan.moves[0].destination.parent().unwrap()).unwrap();
    fs::write(&plan.moves[0].destination, b"occupied").unwrap();

    let report = reorganizer.run(&kept);

    // The occupied batch folder now counts as existing, so the run plans a
    // fresh batch and nothing is overwritten.
    assert_eq!(fs::read(&plan.moves[0].destination).unwrap(), b"occupied");
    assert_eq!(report.moved, 2);
    assert!(report.collisions.is_empty());
}

#[test]
fn test_destination_taken_before_move_is_a_collision() {
    let dir = TempDir::new().unwrap();
    let source = make_folder(dir.path(), 1, &["a.jpg", "b.jpg"]);
    let kept = vec![
        kept_entry(dir.path(), 1, "a.jpg"),
        kept_entry(dir.path(), 1, "b.jpg"),
    ];
    let reorganizer = Reorganizer::new(dir.path(), 10).unwrap();
    let plan = reorganizer.plan(&kept);
    let taken = plan.moves[0].destination.clone();
    fs::create_dir_all(taken.parent().unwrap()).unwrap();
    fs::write(&taken, b"occupied").unwrap();

    let report = reorganizer.execute(plan);

    assert_eq!(report.moved, 1);
    assert_eq!(report.collisions.len(), 1);
    match &report.collisions[0] {
        CleanerError::Collision { source: from, destination } => {
            assert_eq!(from, &source.join("a.jpg"));
            assert_eq!(destination, &taken);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fs::read(source.join("a.jpg")).unwrap(), b"a.jpg");
    assert_eq!(fs::read(&taken).unwrap(), b"occupied");
    assert_eq!(report.remaining_folders, vec![source]);
}

#[test]
fn test_missing_source_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &["here.jpg"]);
    let kept = vec![
        kept_entry(dir.path(), 1, "gone.jpg"),
        kept_entry(dir.path(), 1, "here.jpg"),
    ];

    let report = Reorganizer::new(dir.path(), 10).unwrap().run(&kept);

    assert_eq!(report.moved, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.aborted.is_none());
}

proptest! {
    #[test]
    fn prop_batches_respect_capacity_and_destinations_are_unique(
        files in prop::collection::vec((1u64..5, "[a-c]{1,2}", prop::sample::select(vec!["jpg", "png", "txt"])), 0..120),
        capacity in 1usize..20,
    ) {
        let root = Path::new("/nonexistent/recovery-root");
        let kept: Vec<FileEntry> = files
            .iter()
            .map(|(folder, stem, ext)| kept_entry(root, *folder, &format!("{}.{}", stem, ext)))
            .collect();

        let plan = Reorganizer::new(root, capacity).unwrap().plan(&kept);

        for batch in &plan.batches {
            prop_assert!(batch.current_count <= capacity);
            prop_assert!(batch.current_count > 0);
        }

        let mut seen = HashSet::new();
        for planned in &plan.moves {
            prop_assert!(seen.insert(planned.destination.clone()));
        }

        let distinct_sources: HashSet<_> = kept.iter().map(|f| f.path.clone()).collect();
        prop_assert_eq!(plan.moves.len() + plan.collisions.len(), distinct_sources.len());
    }
}
