// src/diff.rs
//
// Line-level diff between two text snapshots. Pure and deterministic:
// the same (old, new) pair always renders the same diff, and (A, A) is
// always Unchanged. Unchanged regions are omitted from the rendering so
// the output stays bounded for large pages.

/// Classification of a snapshot pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
    /// No substantive difference at line granularity.
    Unchanged,
    /// At least one line added or removed; the payload is the rendered
    /// diff (hunks with `-`/`+` markers) fed to the summarizer.
    Changed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op<'a> {
    Keep,
    Del(&'a str),
    Add(&'a str),
}

/// Compare `old` against `new` at line granularity.
/// Order matters: removals come from `old`, additions from `new`.
pub fn compare(old: &str, new: &str) -> DiffResult {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    if old_lines == new_lines {
        return DiffResult::Unchanged;
    }

    let ops = diff_ops(&old_lines, &new_lines);
    let rendered = render_hunks(&ops);
    if rendered.is_empty() {
        // Line-level walk found only equal hunks.
        DiffResult::Unchanged
    } else {
        DiffResult::Changed(rendered)
    }
}

/// Myers-style LCS walk over the lines, with the common prefix and
/// suffix stripped first to keep the DP table small.
fn diff_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    let mut start = 0usize;
    while start < old.len() && start < new.len() && old[start] == new[start] {
        start += 1;
    }
    let mut old_end = old.len();
    let mut new_end = new.len();
    while old_end > start && new_end > start && old[old_end - 1] == new[new_end - 1] {
        old_end -= 1;
        new_end -= 1;
    }

    let o = &old[start..old_end];
    let n = &new[start..new_end];
    let m = o.len();
    let k = n.len();

    // dp[i][j] = LCS length of o[i..] vs n[j..]
    let mut dp = vec![vec![0u32; k + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..k).rev() {
            dp[i][j] = if o[i] == n[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(old.len() + new.len());
    ops.extend(std::iter::repeat(Op::Keep).take(start));

    let (mut i, mut j) = (0usize, 0usize);
    while i < m && j < k {
        if o[i] == n[j] {
            ops.push(Op::Keep);
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            ops.push(Op::Del(o[i]));
            i += 1;
        } else {
            ops.push(Op::Add(n[j]));
            j += 1;
        }
    }
    while i < m {
        ops.push(Op::Del(o[i]));
        i += 1;
    }
    while j < k {
        ops.push(Op::Add(n[j]));
        j += 1;
    }

    ops.extend(std::iter::repeat(Op::Keep).take(old.len() - old_end));
    ops
}

/// Render maximal runs of changed lines as hunks. Keep runs between
/// hunks are dropped entirely.
fn render_hunks(ops: &[Op<'_>]) -> String {
    let mut out = String::new();
    let mut old_pos = 1usize; // 1-based line numbers
    let mut new_pos = 1usize;

    let mut idx = 0usize;
    while idx < ops.len() {
        match ops[idx] {
            Op::Keep => {
                old_pos += 1;
                new_pos += 1;
                idx += 1;
            }
            _ => {
                let hunk_old_start = old_pos;
                let hunk_new_start = new_pos;
                let mut body = String::new();
                let mut dels = 0usize;
                let mut adds = 0usize;
                while idx < ops.len() {
                    match ops[idx] {
                        Op::Keep => break,
                        Op::Del(line) => {
                            body.push('-');
                            body.push_str(line);
                            body.push('\n');
                            dels += 1;
                            old_pos += 1;
                        }
                        Op::Add(line) => {
                            body.push('+');
                            body.push_str(line);
                            body.push('\n');
                            adds += 1;
                            new_pos += 1;
                        }
                    }
                    idx += 1;
                }
                out.push_str(&format!(
                    "@@ -{hunk_old_start},{dels} +{hunk_new_start},{adds} @@\n"
                ));
                out.push_str(&body);
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(res: DiffResult) -> String {
        match res {
            DiffResult::Changed(s) => s,
            DiffResult::Unchanged => panic!("expected Changed"),
        }
    }

    #[test]
    fn identical_inputs_are_unchanged() {
        assert_eq!(compare("a\nb\nc", "a\nb\nc"), DiffResult::Unchanged);
        assert_eq!(compare("", ""), DiffResult::Unchanged);
    }

    #[test]
    fn trailing_newline_only_is_unchanged() {
        // Same lines, different bytes.
        assert_eq!(compare("a\nb", "a\nb\n"), DiffResult::Unchanged);
    }

    #[test]
    fn appended_line_is_marked_as_addition() {
        let diff = rendered(compare("Line1\nLine2", "Line1\nLine2\nLine3"));
        assert!(diff.contains("+Line3"), "diff was: {diff}");
        assert!(
            diff.lines().all(|l| !l.starts_with('-')),
            "no removals expected: {diff}"
        );
        assert!(!diff.contains("Line1"), "unchanged lines omitted: {diff}");
    }

    #[test]
    fn removed_line_is_marked_as_removal() {
        let diff = rendered(compare("Line1\nLine2\nLine3", "Line1\nLine2"));
        assert!(diff.contains("-Line3"), "diff was: {diff}");
    }

    #[test]
    fn replaced_line_shows_both_sides() {
        let diff = rendered(compare("keep\nold text\nkeep2", "keep\nnew text\nkeep2"));
        assert!(diff.contains("-old text"));
        assert!(diff.contains("+new text"));
        assert!(!diff.contains("keep2"));
    }

    #[test]
    fn order_of_inputs_matters() {
        let ab = rendered(compare("a", "b"));
        let ba = rendered(compare("b", "a"));
        assert!(ab.contains("-a") && ab.contains("+b"));
        assert!(ba.contains("-b") && ba.contains("+a"));
        assert_ne!(ab, ba);
    }

    #[test]
    fn empty_old_renders_all_additions() {
        let diff = rendered(compare("", "one\ntwo"));
        assert!(diff.contains("+one"));
        assert!(diff.contains("+two"));
    }

    #[test]
    fn hunk_header_carries_line_numbers() {
        let diff = rendered(compare("a\nb\nc\nd", "a\nb\nX\nd"));
        assert!(diff.starts_with("@@ -3,1 +3,1 @@"), "diff was: {diff}");
    }

    #[test]
    fn distant_changes_render_as_separate_hunks() {
        let old = "a\nb\nc\nd\ne\nf";
        let new = "A\nb\nc\nd\ne\nF";
        let diff = rendered(compare(old, new));
        assert_eq!(diff.matches("@@").count(), 4, "two hunks: {diff}");
        assert!(diff.contains("-a") && diff.contains("+A"));
        assert!(diff.contains("-f") && diff.contains("+F"));
        assert!(!diff.contains("\nc\n"));
    }
}
