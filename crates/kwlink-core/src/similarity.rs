use std::collections::HashMap;

/// Similarity of `a` and `b` in `[0, 1]`.
///
/// Ratcliff/Obershelp ratio `2 * M / T`: `T` is the combined length and `M`
/// the characters covered by matching blocks, found by taking the longest
/// common substring and recursing on either side of it. Case-sensitive, over
/// chars, no diacritic folding.
///
/// Identical strings score `1.0` (including two empty strings), strings with
/// no character in common score `0.0`. The result does not depend on
/// argument order.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    ratio(&a, &b).max(ratio(&b, &a))
}

fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = BlockMatcher::new(a, b).matched_len();
    (2.0 * matched as f64) / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b_index: HashMap<char, Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    a_start: usize,
    b_start: usize,
    len: usize,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b_index.entry(*c).or_default().push(j);
        }
        Self { a, b, b_index }
    }

    /// Total length of all matching blocks.
    fn matched_len(&self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((a_lo, a_hi, b_lo, b_hi)) = queue.pop() {
            let block = self.longest_match(a_lo, a_hi, b_lo, b_hi);
            if block.len == 0 {
                continue;
            }
            matched += block.len;

            if a_lo < block.a_start && b_lo < block.b_start {
                queue.push((a_lo, block.a_start, b_lo, block.b_start));
            }
            let a_end = block.a_start + block.len;
            let b_end = block.b_start + block.len;
            if a_end < a_hi && b_end < b_hi {
                queue.push((a_end, a_hi, b_end, b_hi));
            }
        }

        matched
    }

    /// Longest block with `a[a_lo..a_hi]` and `b[b_lo..b_hi]`, preferring
    /// the earliest start in `a`, then in `b`.
    fn longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> Block {
        let mut best = Block {
            a_start: a_lo,
            b_start: b_lo,
            len: 0,
        };
        // run length of the match ending at b[j], for the previous row of a
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for i in a_lo..a_hi {
            let mut next_runs = HashMap::new();
            if let Some(positions) = self.b_index.get(&self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let len = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_runs.insert(j, len);
                    if len > best.len {
                        best = Block {
                            a_start: i + 1 - len,
                            b_start: j + 1 - len,
                            len,
                        };
                    }
                }
            }
            run_ending_at = next_runs;
        }

        best
    }
}
