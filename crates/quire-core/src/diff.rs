//! Line diff used to compare note versions

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTag {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub text: String,
}

/// Lines of `old` and `new` aligned on their longest common subsequence.
/// A changed region too large to align comes out as deletes then inserts.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    // Strip the shared head and tail so the table only covers the changed middle
    let head = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let tail = a[head..]
        .iter()
        .rev()
        .zip(b[head..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (mid_a, mid_b) = (&a[head..a.len() - tail], &b[head..b.len() - tail]);

    let mut out: Vec<DiffLine> = a[..head].iter().map(|l| line(DiffTag::Equal, l)).collect();
    out.extend(lcs_diff(mid_a, mid_b));
    out.extend(a[a.len() - tail..].iter().map(|l| line(DiffTag::Equal, l)));
    out
}

fn line(tag: DiffTag, text: &str) -> DiffLine {
    DiffLine {
        tag,
        text: text.to_string(),
    }
}

/// Largest LCS table built for a changed middle. Beyond it the middle is
/// reported as replaced wholesale.
const MAX_TABLE_CELLS: usize = 4_000_000;

fn lcs_diff(a: &[&str], b: &[&str]) -> Vec<DiffLine> {
    let (n, m) = (a.len(), b.len());
    if (n + 1).saturating_mul(m + 1) > MAX_TABLE_CELLS {
        tracing::debug!(old_lines = n, new_lines = m, "Diff too large for line alignment");
        return a
            .iter()
            .map(|l| line(DiffTag::Delete, l))
            .chain(b.iter().map(|l| line(DiffTag::Insert, l)))
            .collect();
    }

    // lengths[i][j] = LCS length of a[i..] and b[j..]
    let mut lengths = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if a[i] == b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            out.push(line(DiffTag::Equal, a[i]));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            out.push(line(DiffTag::Delete, a[i]));
            i += 1;
        } else {
            out.push(line(DiffTag::Insert, b[j]));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| line(DiffTag::Delete, l)));
    out.extend(b[j..].iter().map(|l| line(DiffTag::Insert, l)));
    out
}

/// Render in unified style: `+` inserted, `-` deleted, two spaces unchanged
pub fn render_unified(lines: &[DiffLine]) -> String {
    let mut out = String::new();
    for l in lines {
        let marker = match l.tag {
            DiffTag::Equal => "  ",
            DiffTag::Insert => "+ ",
            DiffTag::Delete => "- ",
        };
        out.push_str(marker);
        out.push_str(&l.text);
        out.push('\n');
    }
    out
}
