// Tests for keep/exclude classification

use proptest::prelude::*;
use recup_cleaner::cleaner::{Decision, RuleSet};

#[test]
fn test_keep_list_scenario() {
    let rules = RuleSet::from_csv("jpg,png", "").unwrap();

    assert_eq!(rules.classify("photo.jpg"), Decision::Keep);
    assert_eq!(rules.classify("note.txt"), Decision::Delete);
}

#[test]
fn test_compound_exclude_scenario() {
    let rules = RuleSet::from_csv("gz", "xml.gz").unwrap();

    assert_eq!(rules.classify("data.xml.gz"), Decision::Delete);
    assert_eq!(rules.classify("data.gz"), Decision::Keep);
}

#[test]
fn test_same_extension_in_both_lists_is_deleted() {
    let rules = RuleSet::from_csv("jpg,jpeg", "jpeg").unwrap();

    assert_eq!(rules.classify("photo.jpg"), Decision::Keep);
    assert_eq!(rules.classify("image.jpeg"), Decision::Delete);
}

#[test]
fn test_rule_normalization() {
    let rules = RuleSet::from_csv(" *.JPG , .png ,", "").unwrap();

    assert!(rules.keep_list().contains("jpg"));
    assert!(rules.keep_list().contains("png"));
    assert_eq!(rules.keep_list().len(), 2);
}

fn extension_segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,4}"
}

proptest! {
    #[test]
    fn prop_exclude_always_wins(
        stem in "[A-Za-z0-9_]{1,8}",
        segments in prop::collection::vec(extension_segment(), 1..4),
        pick in any::<prop::sample::Index>(),
        also_keep in any::<bool>(),
    ) {
        let name = format!("{}.{}", stem, segments.join("."));
        // Any dot-suffix of the extension may be the excluded rule.
        let start = pick.index(segments.len());
        let excluded = segments[start..].join(".");
        let keep = if also_keep { excluded.clone() } else { String::new() };

        let rules = RuleSet::from_csv(&keep, &excluded).unwrap();
        prop_assert_eq!(rules.classify(&name), Decision::Delete);
        prop_assert_eq!(rules.classify(&name.to_uppercase()), Decision::Delete);
    }

    #[test]
    fn prop_exclude_only_keeps_unmatched(
        stem in "[A-Za-z0-9_]{1,8}",
        ext in extension_segment(),
    ) {
        let rules = RuleSet::from_csv("", "zzzzz").unwrap();
        let name = format!("{}.{}", stem, ext);
        prop_assert_eq!(rules.classify(&name), Decision::Keep);
    }
}
