// Tests for folder lifecycle tracking

use std::fs;

use recup_cleaner::cleaner::{FolderState, FolderTracker};
use tempfile::TempDir;

use super::common::make_folder;

#[test]
fn test_highest_folder_becomes_eligible_only_after_successor() {
    let dir = TempDir::new().unwrap();
    for i in 1..=3 {
        make_folder(dir.path(), i, &[]);
    }
    let mut tracker = FolderTracker::new(dir.path());

    let outcome = tracker.scan().unwrap();
    assert_eq!(outcome.active, Some(3));
    let eligible: Vec<u64> = outcome.eligible.iter().map(|f| f.index).collect();
    assert_eq!(eligible, vec![1, 2]);
    for index in eligible {
        assert!(tracker.mark_cleaned(index));
    }
    assert_eq!(tracker.state_of(3), Some(FolderState::Active));

    // Nothing new yet: folder 3 is still being written.
    let outcome = tracker.scan().unwrap();
    assert!(outcome.eligible.is_empty());

    make_folder(dir.path(), 4, &[]);
    let outcome = tracker.scan().unwrap();
    assert_eq!(outcome.active, Some(4));
    assert_eq!(
        outcome.eligible.iter().map(|f| f.index).collect::<Vec<_>>(),
        vec![3]
    );
}

#[test]
fn test_max_index_never_eligible_while_active() {
    let dir = TempDir::new().unwrap();
    let mut tracker = FolderTracker::new(dir.path());

    for next in 1..=6u64 {
        make_folder(dir.path(), next, &[]);
        let outcome = tracker.scan().unwrap();
        assert_eq!(outcome.active, Some(next));
        assert!(outcome.eligible.iter().all(|f| f.index < next));
        for folder in &outcome.eligible {
            tracker.mark_cleaned(folder.index);
        }
    }
    assert_eq!(tracker.cleaned_count(), 5);
}

#[test]
fn test_numeric_ordering_across_digit_boundary() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 9, &[]);
    make_folder(dir.path(), 10, &[]);

    let mut tracker = FolderTracker::new(dir.path());
    let outcome = tracker.scan().unwrap();
    assert_eq!(outcome.active, Some(10));
    assert_eq!(outcome.eligible[0].index, 9);
}

#[test]
fn test_superseded_folder_does_not_reactivate() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &[]);
    let top = make_folder(dir.path(), 2, &[]);
    let mut tracker = FolderTracker::new(dir.path());
    tracker.scan().unwrap();

    fs::remove_dir(top).unwrap();
    let outcome = tracker.scan().unwrap();
    assert_eq!(outcome.active, None);
    assert_eq!(tracker.state_of(1), Some(FolderState::Eligible));
}

#[test]
fn test_custom_prefix() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("out-1")).unwrap();
    fs::create_dir_all(dir.path().join("out-2")).unwrap();
    make_folder(dir.path(), 5, &[]);

    let mut tracker = FolderTracker::with_prefix(dir.path(), "out-");
    let outcome = tracker.scan().unwrap();
    assert_eq!(outcome.active, Some(2));
    assert_eq!(outcome.eligible.len(), 1);
}

#[test]
fn test_fresh_tracker_rederives_state_from_disk() {
    let dir = TempDir::new().unwrap();
    make_folder(dir.path(), 1, &[]);
    make_folder(dir.path(), 2, &[]);

    let mut first = FolderTracker::new(dir.path());
    first.scan().unwrap();
    first.mark_cleaned(1);

    // A restart loses the in-memory Cleaned mark; folder 1 is offered again.
    let mut second = FolderTracker::new(dir.path());
    let outcome = second.scan().unwrap();
    assert_eq!(outcome.eligible[0].index, 1);
}
