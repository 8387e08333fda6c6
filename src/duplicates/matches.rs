//! Pairwise similarity matching over a folder's fingerprint table.
//!
//! # Overview
//!
//! [`find_matches`] compares every unordered pair of distinct filenames in a
//! fingerprint table exactly once and keeps the pairs whose similarity meets
//! the threshold. Pairs are generated canonically: entries are taken in
//! filename order and only `(i, j)` with `i < j` is visited, so a pair can
//! never be reported twice or in both orientations.
//!
//! # Example
//!
//! ```
//! use imagedupe::duplicates::find_matches;
//! use imagedupe::scanner::PerceptualHasher;
//! use std::collections::BTreeMap;
//!
//! let mut table = BTreeMap::new();
//! table.insert("a.jpg".to_string(), 0b0000u64);
//! table.insert("b.jpg".to_string(), 0b0001u64);
//! table.insert("c.jpg".to_string(), u64::MAX);
//!
//! let matches = find_matches(&table, 90.0, &PerceptualHasher::default());
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].first, "a.jpg");
//! assert_eq!(matches[0].second, "b.jpg");
//! ```

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::scanner::Fingerprinter;

/// One unordered pair of images judged similar.
///
/// `first` always sorts before `second`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMatch {
    /// Filename that sorts first
    pub first: String,
    /// Filename that sorts second
    pub second: String,
    /// Similarity score on the fingerprinter's scale
    pub similarity: f64,
}

impl ImageMatch {
    /// Create a match, ordering the two filenames.
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>, similarity: f64) -> Self {
        let (a, b) = (a.into(), b.into());
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first,
            second,
            similarity,
        }
    }

    /// Whether this match covers the unordered pair `{a, b}`.
    #[must_use]
    pub fn is_pair(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

/// Find every unordered pair whose similarity is at least `threshold`.
///
/// The returned list is ordered by first filename, then second filename.
/// Display ordering (most similar first) is left to the caller, see
/// [`sort_by_similarity`].
#[must_use]
pub fn find_matches(
    table: &BTreeMap<String, u64>,
    threshold: f64,
    fingerprinter: &dyn Fingerprinter,
) -> Vec<ImageMatch> {
    let owned: Vec<(&String, u64)> = table.iter().map(|(name, fp)| (name, *fp)).collect();
    let entries: &[(&String, u64)] = &owned;
    let n = entries.len();

    if n < 2 {
        return Vec::new();
    }

    log::debug!(
        "Comparing {} images ({} pairs) at threshold {}",
        n,
        n * (n - 1) / 2,
        threshold
    );

    let matches: Vec<ImageMatch> = (0..n)
        .into_par_iter()
        .flat_map_iter(move |i| {
            let all = entries;
            let (first, fp_a) = all[i];
            all[i + 1..]
                .iter()
                .filter_map(move |&(second, fp_b)| {
                    let similarity = fingerprinter.similarity(fp_a, fp_b);
                    (similarity >= threshold).then(|| ImageMatch {
                        first: first.clone(),
                        second: second.clone(),
                        similarity,
                    })
                })
        })
        .collect();

    log::debug!("Found {} matching pairs", matches.len());
    matches
}

/// Sort matches for display: most similar first, then by filenames.
pub fn sort_by_similarity(matches: &mut [ImageMatch]) {
    matches.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.first.cmp(&b.first))
            .then_with(|| a.second.cmp(&b.second))
    });
}
