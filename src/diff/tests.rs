//! Tests for unified diff rendering.

use super::{DEFAULT_CONTEXT, diff_stat, unified_diff};
use pretty_assertions::assert_eq;

#[test]
fn test_identical_content_has_empty_diff() {
    let text = "int main() {\nreturn 0;\n}\n";
    assert_eq!(unified_diff(text, text, "a.c", DEFAULT_CONTEXT), "");
}

#[test]
fn test_single_line_change() {
    let old = "int main() {\n    return 0;\n}\n";
    let new = "int main() {\n  return 0;\n}\n";

    let diff = unified_diff(old, new, "b.c", DEFAULT_CONTEXT);

    assert_eq!(
        diff,
        "--- b.c\t(before formatting)\n\
         +++ b.c\t(after formatting)\n\
         @@ -1,3 +1,3 @@\n \
         int main() {\n\
         -    return 0;\n\
         +  return 0;\n \
         }\n"
    );
}

#[test]
fn test_distant_changes_produce_separate_hunks() {
    let old: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
    let new = old
        .replace("line 2\n", "LINE 2\n")
        .replace("line 18\n", "LINE 18\n");

    let diff = unified_diff(&old, &new, "f.c", DEFAULT_CONTEXT);
    let headers: Vec<&str> = diff.lines().filter(|l| l.starts_with("@@")).collect();

    assert_eq!(headers, vec!["@@ -1,5 +1,5 @@", "@@ -15,6 +15,6 @@"]);
}

#[test]
fn test_nearby_changes_share_a_hunk() {
    let old: String = (1..=12).map(|i| format!("{}\n", i)).collect();
    let new = old.replace("3\n", "three\n").replace("8\n", "eight\n");

    let diff = unified_diff(&old, &new, "f.c", DEFAULT_CONTEXT);
    let hunks = diff.lines().filter(|l| l.starts_with("@@")).count();

    assert_eq!(hunks, 1);
}

#[test]
fn test_pure_insertion_range_format() {
    let old = "a\nb\n";
    let new = "a\nb\nc\n";

    let diff = unified_diff(old, new, "x.h", 0);

    assert!(diff.contains("@@ -2,0 +3 @@\n+c\n"), "diff was:\n{}", diff);
}

#[test]
fn test_missing_trailing_newline_is_marked() {
    let old = "a\nb";
    let new = "a\nb\n";

    let diff = unified_diff(old, new, "x.c", DEFAULT_CONTEXT);

    assert!(diff.contains("-b\n\\ No newline at end of file\n+b\n"));
}

#[test]
fn test_empty_original() {
    let diff = unified_diff("", "int x;\n", "new.c", DEFAULT_CONTEXT);
    assert!(diff.contains("@@ -0,0 +1 @@\n+int x;\n"));
}

#[test]
fn test_diff_stat_counts_body_lines_only() {
    let old = "a\nb\nc\n";
    let new = "a\nB\nc\nd\n";
    let diff = unified_diff(old, new, "s.c", DEFAULT_CONTEXT);

    let stat = diff_stat(&diff);
    assert_eq!(stat.added, 2);
    assert_eq!(stat.removed, 1);
}

#[test]
fn test_large_rewrite_falls_back_to_block_replacement() {
    let old: String = (0..3000).map(|i| format!("  line {}\n", i)).collect();
    let new: String = (0..3000).map(|i| format!("line {}\n", i)).collect();

    let diff = unified_diff(&old, &new, "big.c", DEFAULT_CONTEXT);
    let stat = diff_stat(&diff);

    assert_eq!(stat.removed, 3000);
    assert_eq!(stat.added, 3000);
    assert!(diff.contains("@@ -1,3000 +1,3000 @@"));
}
