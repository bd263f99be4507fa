//! Unified diff rendering for check mode.
//!
//! The formatter returns the formatted file on stdout; this module turns the
//! original content and that output into a unified diff with the usual
//! `---`/`+++` headers and `@@` hunks. Headers carry `(before formatting)` /
//! `(after formatting)` labels in place of timestamps.
//!
//! Line endings are preserved. A final line without a trailing newline is
//! followed by the conventional `\ No newline at end of file` marker.

mod myers;

#[cfg(test)]
mod tests;

use myers::Edit;

/// Lines of unchanged context around each change.
pub const DEFAULT_CONTEXT: usize = 3;

/// Render a unified diff between `old` and `new`.
///
/// Returns an empty string when the inputs are identical.
pub fn unified_diff(old: &str, new: &str, label: &str, context: usize) -> String {
    if old == new {
        return String::new();
    }

    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();
    let edits = myers::edit_script(&a, &b);

    let mut out = String::new();
    out.push_str(&format!("--- {}\t(before formatting)\n", label));
    out.push_str(&format!("+++ {}\t(after formatting)\n", label));

    for group in group_hunks(&edits, context) {
        render_hunk(&mut out, &edits[group.0..group.1], &a, &b);
    }

    out
}

/// Count of changed lines, used for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub added: usize,
    pub removed: usize,
}

/// Count `+`/`-` body lines of a unified diff.
pub fn diff_stat(diff: &str) -> DiffStat {
    let mut stat = DiffStat::default();
    let mut in_hunk = false;
    for line in diff.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        if line.starts_with('+') {
            stat.added += 1;
        } else if line.starts_with('-') {
            stat.removed += 1;
        }
    }
    stat
}

/// Split the edit script into hunk ranges `[start, end)`.
///
/// Changes separated by at most `2 * context` unchanged lines share a hunk.
fn group_hunks(edits: &[Edit], context: usize) -> Vec<(usize, usize)> {
    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| !matches!(e, Edit::Equal { .. }))
        .map(|(i, _)| i)
        .collect();

    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(edits.len());
        match groups.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => groups.push((start, end)),
        }
    }
    groups
}

fn render_hunk(out: &mut String, hunk: &[Edit], a: &[&str], b: &[&str]) {
    let (old_start, new_start) = match hunk.first() {
        Some(edit) => edit.positions(),
        None => return,
    };
    let old_len = hunk
        .iter()
        .filter(|e| !matches!(e, Edit::Insert { .. }))
        .count();
    let new_len = hunk
        .iter()
        .filter(|e| !matches!(e, Edit::Delete { .. }))
        .count();

    out.push_str(&format!(
        "@@ -{} +{} @@\n",
        format_range(old_start, old_len),
        format_range(new_start, new_len)
    ));

    for edit in hunk {
        match *edit {
            Edit::Equal { old, .. } => push_line(out, ' ', a[old]),
            Edit::Delete { old, .. } => push_line(out, '-', a[old]),
            Edit::Insert { new, .. } => push_line(out, '+', b[new]),
        }
    }
}

fn push_line(out: &mut String, prefix: char, line: &str) {
    out.push(prefix);
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push_str("\n\\ No newline at end of file\n");
    }
}

/// Format a hunk range (`start` is 0-based).
///
/// A single line prints only its line number; an empty range points at the
/// line before the insertion point.
fn format_range(start: usize, len: usize) -> String {
    match len {
        1 => format!("{}", start + 1),
        0 => format!("{},0", start),
        _ => format!("{},{}", start + 1, len),
    }
}
