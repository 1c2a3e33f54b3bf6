//! Content digests and similarity between canonical texts
//!
//! The digest is the fast path: equal digests mean identical canonical text.
//! Only when digests differ is the (much more expensive) similarity ratio
//! computed, to tell cosmetic drift from substantive change.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{ComparisonResult, ContentDigest};

/// SHA-256 of the canonical text, lowercase hex
pub fn digest(canonical_text: &str) -> ContentDigest {
    ContentDigest::compute(canonical_text)
}

/// Compare two canonical texts: digests first, ratio only when they differ
pub fn compare(text_a: &str, text_b: &str) -> ComparisonResult {
    let digest_a = digest(text_a);
    let digest_b = digest(text_b);
    let equal = digest_a == digest_b;
    let similarity_ratio = if equal {
        None
    } else {
        Some(similarity(text_a, text_b))
    };

    ComparisonResult {
        digest_a,
        digest_b,
        equal,
        similarity_ratio,
    }
}

/// Matching-blocks similarity ratio in [0, 1].
///
/// `2 * M / (|a| + |b|)` over chars, where `M` is the total length of the
/// blocks found by taking the longest common substring and recursing on the
/// pieces to its left and right (Ratcliff/Obershelp). Two empty inputs are
/// identical, so 1.0.
pub fn similarity(text_a: &str, text_b: &str) -> f64 {
    let a: Vec<char> = text_a.chars().collect();
    let b: Vec<char> = text_b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched: usize = SequenceMatcher::new(&a, &b)
        .matching_blocks()
        .iter()
        .map(|block| block.size)
        .sum();

    (2.0 * matched as f64) / total as f64
}

/// A run of `size` equal elements at `a[a_start..]` and `b[b_start..]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

/// Longest-matching-blocks search over two sequences
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        Self { a, b }
    }

    /// Longest block within `a[a_lo..a_hi]` and `b[b_lo..b_hi]`.
    ///
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    /// Linear in the two range lengths: `a` is walked through a suffix
    /// automaton of the `b` range.
    pub fn find_longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> MatchBlock {
        let mut best = MatchBlock {
            a_start: a_lo,
            b_start: b_lo,
            size: 0,
        };
        if a_lo >= a_hi || b_lo >= b_hi {
            return best;
        }

        let automaton = SuffixAutomaton::build(&self.b[b_lo..b_hi]);
        let mut state = 0;
        // Length of the longest suffix of a[a_lo..=i] found in the b range
        let mut length = 0;

        for i in a_lo..a_hi {
            let item = &self.a[i];
            while state != 0 && automaton.next(state, item).is_none() {
                state = automaton.link(state);
                length = automaton.len(state);
            }
            match automaton.next(state, item) {
                Some(next) => {
                    state = next;
                    length += 1;
                }
                None => length = 0,
            }

            // Strictly longer only, so the earliest end in `a` wins; the
            // state's first end position gives the earliest start in `b`
            if length > best.size {
                best = MatchBlock {
                    a_start: i + 1 - length,
                    b_start: b_lo + automaton.first_end(state) + 1 - length,
                    size: length,
                };
            }
        }
        best
    }

    /// All matching blocks in ascending order, adjacent blocks merged
    pub fn matching_blocks(&self) -> Vec<MatchBlock> {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
            let block = self.find_longest_match(a_lo, a_hi, b_lo, b_hi);
            if block.size == 0 {
                continue;
            }
            blocks.push(block);
            if a_lo < block.a_start && b_lo < block.b_start {
                pending.push((a_lo, block.a_start, b_lo, block.b_start));
            }
            let a_end = block.a_start + block.size;
            let b_end = block.b_start + block.size;
            if a_end < a_hi && b_end < b_hi {
                pending.push((a_end, a_hi, b_end, b_hi));
            }
        }
        blocks.sort_by_key(|block| (block.a_start, block.b_start));

        let mut merged: Vec<MatchBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(last) = merged.last_mut() {
                if last.a_start + last.size == block.a_start && last.b_start + last.size == block.b_start {
                    last.size += block.size;
                    continue;
                }
            }
            merged.push(block);
        }
        merged
    }
}

struct AutomatonState<'a, T> {
    len: usize,
    link: Option<usize>,
    /// Smallest end position of the substrings this state stands for
    first_end: usize,
    next: HashMap<&'a T, usize>,
}

/// Suffix automaton over one sequence: every substring is a path from the
/// root, and each state knows where its substrings first end.
struct SuffixAutomaton<'a, T> {
    states: Vec<AutomatonState<'a, T>>,
}

impl<'a, T: Eq + Hash> SuffixAutomaton<'a, T> {
    fn build(items: &'a [T]) -> Self {
        let mut states = Vec::with_capacity(items.len() * 2 + 1);
        states.push(AutomatonState {
            len: 0,
            link: None,
            first_end: 0,
            next: HashMap::new(),
        });
        let mut last = 0;

        for (pos, item) in items.iter().enumerate() {
            let cur = states.len();
            let len = states[last].len + 1;
            states.push(AutomatonState {
                len,
                link: Some(0),
                first_end: pos,
                next: HashMap::new(),
            });

            let mut p = Some(last);
            let mut existing = None;
            while let Some(state) = p {
                if let Some(q) = states[state].next.get(item).copied() {
                    existing = Some((state, q));
                    break;
                }
                states[state].next.insert(item, cur);
                p = states[state].link;
            }

            if let Some((p, q)) = existing {
                if states[p].len + 1 == states[q].len {
                    states[cur].link = Some(q);
                } else {
                    let clone = states.len();
                    let cloned = AutomatonState {
                        len: states[p].len + 1,
                        link: states[q].link,
                        first_end: states[q].first_end,
                        next: states[q].next.clone(),
                    };
                    states.push(cloned);

                    let mut r = Some(p);
                    while let Some(state) = r {
                        if states[state].next.get(item) != Some(&q) {
                            break;
                        }
                        states[state].next.insert(item, clone);
                        r = states[state].link;
                    }
                    states[q].link = Some(clone);
                    states[cur].link = Some(clone);
                }
            }
            last = cur;
        }

        Self { states }
    }

    fn next(&self, state: usize, item: &T) -> Option<usize> {
        self.states[state].next.get(item).copied()
    }

    fn link(&self, state: usize) -> usize {
        self.states[state].link.unwrap_or(0)
    }

    fn len(&self, state: usize) -> usize {
        self.states[state].len
    }

    fn first_end(&self, state: usize) -> usize {
        self.states[state].first_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_digest_stable() {
        let text = "Some canonical text";
        assert_eq!(digest(text), digest(text));
        assert_ne!(digest(text), digest("Some canonical text."));
    }

    #[test]
    fn test_compare_equal_has_no_ratio() {
        let result = compare("same", "same");
        assert!(result.equal);
        assert!(result.similarity_ratio.is_none());
        assert_eq!(result.digest_a, result.digest_b);
    }

    #[test]
    fn test_compare_unequal_has_ratio() {
        let result = compare("abcd", "abce");
        assert!(!result.equal);
        assert_eq!(result.similarity_ratio, Some(0.75));
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_similarity_known_value() {
        // Longest block is "bcd"; nothing matches on either side of it
        let ratio = similarity("abcd", "bcda");
        assert!((ratio - 0.75).abs() < 1e-12, "ratio = {}", ratio);
    }

    #[test]
    fn test_appended_paragraph_is_similar() {
        let base = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let appended = format!("{}One more short sentence here.", base);
        let ratio = similarity(&base, &appended);
        assert!(ratio >= 0.9, "ratio = {}", ratio);
        assert!(ratio < 1.0);
    }

    #[test]
    fn test_longest_match_tie_break() {
        let a = chars("xab ab");
        let b = chars("ab");
        let matcher = SequenceMatcher::new(&a, &b);
        let block = matcher.find_longest_match(0, a.len(), 0, b.len());
        assert_eq!(block, MatchBlock { a_start: 1, b_start: 0, size: 2 });
    }

    #[test]
    fn test_matching_blocks_merged_and_ordered() {
        let a = chars("abxcd");
        let b = chars("abycd");
        let blocks = SequenceMatcher::new(&a, &b).matching_blocks();
        assert_eq!(
            blocks,
            vec![
                MatchBlock { a_start: 0, b_start: 0, size: 2 },
                MatchBlock { a_start: 3, b_start: 3, size: 2 },
            ]
        );
    }

    /// Every (i, j) start, extended as far as it goes
    fn longest_match_by_scan(a: &[char], b: &[char]) -> MatchBlock {
        let mut best = MatchBlock { a_start: 0, b_start: 0, size: 0 };
        for i in 0..a.len() {
            for j in 0..b.len() {
                let mut k = 0;
                while i + k < a.len() && j + k < b.len() && a[i + k] == b[j + k] {
                    k += 1;
                }
                if k > best.size {
                    best = MatchBlock { a_start: i, b_start: j, size: k };
                }
            }
        }
        best
    }

    #[test]
    fn test_longest_match_agrees_with_scan() {
        let cases = [
            ("abcabcabc", "cabca"),
            ("aaaa", "aa"),
            ("the cat sat on the mat", "a cat sat on a mat"),
            ("banana bandana", "ananas and bananas"),
            ("xyz", "abc"),
            ("abab", "baba"),
        ];
        for (a, b) in cases {
            let (a, b) = (chars(a), chars(b));
            let matcher = SequenceMatcher::new(&a, &b);
            assert_eq!(
                matcher.find_longest_match(0, a.len(), 0, b.len()),
                longest_match_by_scan(&a, &b),
                "{:?} vs {:?}",
                a.iter().collect::<String>(),
                b.iter().collect::<String>()
            );
        }
    }

    #[test]
    fn test_longest_match_respects_ranges() {
        let a = chars("abcdxabcd");
        let b = chars("zabcd");
        let matcher = SequenceMatcher::new(&a, &b);
        assert_eq!(
            matcher.find_longest_match(4, a.len(), 2, b.len()),
            MatchBlock { a_start: 6, b_start: 2, size: 3 }
        );
        assert_eq!(matcher.find_longest_match(3, 3, 0, b.len()).size, 0);
    }

    #[test]
    fn test_similarity_large_page_is_fast() {
        let paragraph = |n: usize| {
            format!(
                "Paragraph {} of the public notice: hours, contacts and service changes are listed here. ",
                n
            )
        };
        let first: String = (0..1500).map(paragraph).collect();
        let second: String = (0..1500)
            .map(|n| {
                if n % 50 == 0 {
                    format!("{}Updated this week. ", paragraph(n))
                } else {
                    paragraph(n)
                }
            })
            .collect();
        assert!(first.len() > 80_000);

        let started = std::time::Instant::now();
        let ratio = similarity(&first, &second);
        assert!(ratio > 0.99 && ratio < 1.0, "ratio = {}", ratio);
        assert!(
            started.elapsed() < std::time::Duration::from_secs(30),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_similarity_symmetric_on_sizes() {
        let a = "hello world, this is a page";
        let b = "hello there, this was a page";
        let ab = similarity(a, b);
        assert!(ab > 0.5 && ab < 1.0);
    }
}
