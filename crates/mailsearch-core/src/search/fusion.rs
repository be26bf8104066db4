// Weighted Reciprocal Rank Fusion (RRF)

use super::types::{DocumentId, MatchType, SearchResult};
use crate::config::MAX_HYBRID_HIGHLIGHTS;
use std::cmp::Ordering;
use std::collections::HashMap;

pub use crate::config::RRF_K;

/// Contribution of one ranker to a document's fused score.
///
/// `rank` is the 0-based position in that ranker's own sorted list.
pub fn rrf_contribution(weight: f64, rank: usize, k: usize) -> f64 {
    weight / (k + rank + 1) as f64
}

/// Combine two ranked result lists using weighted RRF.
///
/// RRF Formula: `fused(d) = alpha / (k + rank_sem(d) + 1) + (1 - alpha) / (k + rank_lex(d) + 1)`
///
/// Where:
/// - `rank_*` is the 0-based position of `d` in that ranker's list
/// - a document absent from one list gets no contribution from it
/// - `k` is a constant (60) that damps the advantage of top positions
///
/// Because only ranks are used, the two rankers' score scales never need to
/// be normalized against each other. With `alpha = 0` the output order is the
/// lexical order, with `alpha = 1` the semantic order.
///
/// Equal fused scores are ordered by document id ascending. Results are
/// relabeled [`MatchType::Hybrid`] and their highlights are the union of both
/// rankers' highlights (semantic first), capped at
/// [`MAX_HYBRID_HIGHLIGHTS`]. A document returned by both rankers carries the
/// lexical ranker's copy, which is the indexed email rather than one rebuilt
/// from chunk metadata.
pub fn reciprocal_rank_fusion(
    semantic: Vec<SearchResult>,
    lexical: Vec<SearchResult>,
    alpha: f64,
    k: usize,
    limit: usize,
) -> Vec<SearchResult> {
    let mut fused: HashMap<DocumentId, SearchResult> = HashMap::new();

    let rankers = [(semantic, alpha, false), (lexical, 1.0 - alpha, true)];
    for (results, weight, authoritative) in rankers {
        for (rank, result) in results.into_iter().enumerate() {
            let contribution = rrf_contribution(weight, rank, k);
            match fused.get_mut(&result.document.id) {
                Some(existing) => {
                    existing.score += contribution;
                    if authoritative {
                        existing.document = result.document;
                    }
                    for highlight in result.highlights {
                        if !existing.highlights.contains(&highlight) {
                            existing.highlights.push(highlight);
                        }
                    }
                }
                None => {
                    let mut entry = result;
                    entry.score = contribution;
                    entry.match_type = MatchType::Hybrid;
                    fused.insert(entry.document.id.clone(), entry);
                }
            }
        }
    }

    let mut combined: Vec<SearchResult> = fused.into_values().collect();
    combined.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    combined.truncate(limit);
    for result in &mut combined {
        result.highlights.truncate(MAX_HYBRID_HIGHLIGHTS);
    }
    combined
}
