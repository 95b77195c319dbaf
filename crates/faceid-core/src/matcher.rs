//! Nearest-identity matching over a gallery of registered records.

use crate::types::{Embedding, IdentityRecord, MatchResult, RecordId};

/// Strategy for comparing a probe embedding against a gallery of registered faces.
///
/// Implementations receive a probe already validated against the gallery
/// dimension. An index-backed implementation can replace [`LinearScanMatcher`]
/// as long as it returns the same result for the same input.
pub trait Matcher: Send + Sync {
    fn compare(&self, probe: &Embedding, gallery: &[IdentityRecord], threshold: f32) -> MatchResult;
}

/// Euclidean linear-scan matcher.
///
/// Visits every record in insertion order. On equal distances the earlier
/// record wins. A match requires `distance < threshold`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScanMatcher;

impl Matcher for LinearScanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[IdentityRecord], threshold: f32) -> MatchResult {
        let mut best: Option<(usize, f64)> = None;
        let threshold = f64::from(threshold);

        for (i, record) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&record.embedding);
            let is_better = match best {
                None => true,
                Some((_, best_dist)) => dist < best_dist,
            };
            if is_better {
                best = Some((i, dist));
            }
        }

        tracing::debug!(
            records = gallery.len(),
            best_index = ?best.map(|(i, _)| i),
            best_distance = ?best.map(|(_, d)| d),
            threshold,
            "linear scan complete"
        );

        match best {
            Some((idx, dist)) if dist < threshold => MatchResult {
                label: gallery[idx].label.clone(),
                distance: Some(dist),
                matched_record: Some(RecordId(idx)),
            },
            Some((_, dist)) => MatchResult::unknown(Some(dist)),
            None => MatchResult::unknown(None),
        }
    }
}
