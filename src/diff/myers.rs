//! Line-level edit script via Myers' O(ND) algorithm.
//!
//! Snapshots of the furthest-reaching paths are kept per edit distance for
//! backtracking, so memory grows with D². Past `MAX_EDIT_DISTANCE` the search
//! stops and the remaining middle section is emitted as one delete block
//! followed by one insert block, which is still a correct (if less minimal)
//! diff.

/// Edit distance at which the search gives up on a minimal script.
const MAX_EDIT_DISTANCE: usize = 1000;

/// One step of an edit script, carrying the 0-based line positions in the
/// old and new sequences at which it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Edit {
    Equal { old: usize, new: usize },
    Delete { old: usize, new: usize },
    Insert { old: usize, new: usize },
}

impl Edit {
    pub(super) fn positions(&self) -> (usize, usize) {
        match *self {
            Edit::Equal { old, new } | Edit::Delete { old, new } | Edit::Insert { old, new } => {
                (old, new)
            }
        }
    }
}

/// Compute an edit script turning `a` into `b`.
pub(super) fn edit_script(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut edits: Vec<Edit> = (0..prefix)
        .map(|i| Edit::Equal { old: i, new: i })
        .collect();

    let middle = shortest_edit(mid_a, mid_b).unwrap_or_else(|| replace_block(mid_a, mid_b));
    edits.extend(middle.into_iter().map(|e| shift(e, prefix)));

    let old_tail = a.len() - suffix;
    let new_tail = b.len() - suffix;
    edits.extend((0..suffix).map(|i| Edit::Equal {
        old: old_tail + i,
        new: new_tail + i,
    }));

    edits
}

fn shift(edit: Edit, by: usize) -> Edit {
    match edit {
        Edit::Equal { old, new } => Edit::Equal {
            old: old + by,
            new: new + by,
        },
        Edit::Delete { old, new } => Edit::Delete {
            old: old + by,
            new: new + by,
        },
        Edit::Insert { old, new } => Edit::Insert {
            old: old + by,
            new: new + by,
        },
    }
}

fn replace_block(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let deletes = (0..a.len()).map(|i| Edit::Delete { old: i, new: 0 });
    let inserts = (0..b.len()).map(|j| Edit::Insert {
        old: a.len(),
        new: j,
    });
    deletes.chain(inserts).collect()
}

/// Myers forward search with backtracking. Returns `None` when the edit
/// distance exceeds `MAX_EDIT_DISTANCE`.
fn shortest_edit(a: &[&str], b: &[&str]) -> Option<Vec<Edit>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (a.len() + b.len()).min(MAX_EDIT_DISTANCE) as isize;
    let offset = max + 1;
    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=max {
        // Snapshot of diagonals -d..=d before this round.
        trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());

        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                return Some(backtrack(&trace, a, b));
            }
            k += 2;
        }
    }

    None
}

fn backtrack(trace: &[Vec<isize>], a: &[&str], b: &[&str]) -> Vec<Edit> {
    let mut x = a.len() as isize;
    let mut y = b.len() as isize;
    let mut edits = Vec::new();

    for (d, snapshot) in trace.iter().enumerate().rev() {
        let d = d as isize;
        if d == 0 {
            while x > 0 && y > 0 {
                x -= 1;
                y -= 1;
                edits.push(Edit::Equal {
                    old: x as usize,
                    new: y as usize,
                });
            }
            break;
        }

        let at = |k: isize| snapshot[(k + d) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal {
                old: x as usize,
                new: y as usize,
            });
        }

        if x == prev_x {
            edits.push(Edit::Insert {
                old: x as usize,
                new: prev_y as usize,
            });
        } else {
            edits.push(Edit::Delete {
                old: prev_x as usize,
                new: y as usize,
            });
        }

        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}
