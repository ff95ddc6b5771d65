//! Line-based three-way merge.
//!
//! Used as a fallback for comment bodies, whose contents have no further
//! tree structure to merge. Built on LCS line diffing from the `similar`
//! crate, following the classic diff3 region partitioning (Khanna, Kuber,
//! Pierce, "A Formal Investigation of Diff3", 2007): lines stable in both
//! derived revisions anchor the output, and each unstable region between
//! anchors is resolved by the three-way rule or emitted as a
//! conflict-marked block.

use similar::{DiffOp, TextDiff};

/// Merge `left` and `right` against `base` line by line.
///
/// Returns the merged text and the number of conflict hunks. A count of
/// zero means the merge is clean; otherwise the text contains
/// `<<<<<<< LEFT` / `||||||| BASE` / `=======` / `>>>>>>> RIGHT` blocks.
pub fn merge(base: &str, left: &str, right: &str) -> (String, usize) {
    let base_lines: Vec<&str> = base.lines().collect();
    let left_lines: Vec<&str> = left.lines().collect();
    let right_lines: Vec<&str> = right.lines().collect();

    let left_map = alignment(base, left, base_lines.len());
    let right_map = alignment(base, right, base_lines.len());

    // Base lines stable in both revisions, with their positions there.
    let anchors: Vec<(usize, usize, usize)> = (0..base_lines.len())
        .filter_map(|b| match (left_map[b], right_map[b]) {
            (Some(l), Some(r)) => Some((b, l, r)),
            _ => None,
        })
        .collect();

    let mut out: Vec<String> = Vec::new();
    let mut conflicts = 0;
    let mut next = (0usize, 0usize, 0usize);
    let mut idx = 0;

    while idx < anchors.len() {
        // Extend the anchor into a maximal run consecutive in all three.
        let mut end = idx;
        while end + 1 < anchors.len() {
            let (b, l, r) = anchors[end];
            if anchors[end + 1] == (b + 1, l + 1, r + 1) {
                end += 1;
            } else {
                break;
            }
        }

        let (b, l, r) = anchors[idx];
        emit_unstable(
            &mut out,
            &mut conflicts,
            &base_lines[next.0..b],
            &left_lines[next.1..l],
            &right_lines[next.2..r],
        );
        for (stable, _, _) in &anchors[idx..=end] {
            out.push(base_lines[*stable].to_string());
        }

        let (b, l, r) = anchors[end];
        next = (b + 1, l + 1, r + 1);
        idx = end + 1;
    }

    emit_unstable(
        &mut out,
        &mut conflicts,
        &base_lines[next.0..],
        &left_lines[next.1..],
        &right_lines[next.2..],
    );

    (out.join("\n"), conflicts)
}

/// Map each base line to its position in `revised`, where unchanged.
fn alignment(base: &str, revised: &str, base_len: usize) -> Vec<Option<usize>> {
    let diff = TextDiff::from_lines(base, revised);
    let mut map = vec![None; base_len];
    for op in diff.ops() {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = *op
        {
            for k in 0..len {
                map[old_index + k] = Some(new_index + k);
            }
        }
    }
    map
}

fn emit_unstable(
    out: &mut Vec<String>,
    conflicts: &mut usize,
    base: &[&str],
    left: &[&str],
    right: &[&str],
) {
    if base.is_empty() && left.is_empty() && right.is_empty() {
        return;
    }

    if left == base {
        out.extend(right.iter().map(|s| s.to_string()));
    } else if right == base || left == right {
        out.extend(left.iter().map(|s| s.to_string()));
    } else {
        *conflicts += 1;
        out.push("<<<<<<< LEFT".to_string());
        out.extend(left.iter().map(|s| s.to_string()));
        out.push("||||||| BASE".to_string());
        out.extend(base.iter().map(|s| s.to_string()));
        out.push("=======".to_string());
        out.extend(right.iter().map(|s| s.to_string()));
        out.push(">>>>>>> RIGHT".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_edits_merge_cleanly() {
        let base = "one\ntwo\nthree";
        let left = "ONE\ntwo\nthree";
        let right = "one\ntwo\nTHREE";
        let (merged, conflicts) = merge(base, left, right);
        assert_eq!(conflicts, 0);
        assert_eq!(merged, "ONE\ntwo\nTHREE");
    }

    #[test]
    fn identical_edits_merge_cleanly() {
        let base = "a\nb";
        let left = "a\nchanged";
        let right = "a\nchanged";
        let (merged, conflicts) = merge(base, left, right);
        assert_eq!(conflicts, 0);
        assert_eq!(merged, "a\nchanged");
    }

    #[test]
    fn one_sided_insertion_is_kept() {
        let base = "a\nb";
        let left = "a\nmiddle\nb";
        let right = "a\nb";
        let (merged, conflicts) = merge(base, left, right);
        assert_eq!(conflicts, 0);
        assert_eq!(merged, "a\nmiddle\nb");
    }

    #[test]
    fn competing_edits_conflict_with_markers() {
        let base = "old line\nold";
        let left = "old line\nnew-left";
        let right = "old line\nnew-right";
        let (merged, conflicts) = merge(base, left, right);
        assert_eq!(conflicts, 1);
        assert_eq!(
            merged,
            "old line\n<<<<<<< LEFT\nnew-left\n||||||| BASE\nold\n=======\nnew-right\n>>>>>>> RIGHT"
        );
    }

    #[test]
    fn deletion_against_unchanged_side() {
        let base = "a\nb\nc";
        let left = "a\nc";
        let right = "a\nb\nc";
        let (merged, conflicts) = merge(base, left, right);
        assert_eq!(conflicts, 0);
        assert_eq!(merged, "a\nc");
    }
}
