//! Vector similarity utilities shared by every store.

use lectern_core::index::{MetadataFilter, ScoredDocument, StoredDocument};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank documents matching `filter` by similarity to `query`.
///
/// Most similar first; ties break on id so results are deterministic.
pub fn rank_by_similarity<'a>(
    documents: impl IntoIterator<Item = &'a StoredDocument>,
    query: &[f32],
    filter: &MetadataFilter,
    limit: usize,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .into_iter()
        .filter(|doc| filter.matches(&doc.metadata))
        .map(|doc| ScoredDocument {
            similarity: cosine_similarity(&doc.embedding, query),
            document: doc.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    scored.truncate(limit);
    scored
}
