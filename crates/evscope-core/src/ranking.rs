//! Descending ranking with stable tie-break

use crate::EngineError;

/// Order `counts` by count, highest first. Equal counts keep their input order.
pub fn rank_descending<K: Clone>(counts: &[(K, usize)]) -> Vec<(K, usize)> {
    let mut ranked = counts.to_vec();
    // sort_by is stable, which is what keeps ties in first-seen order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// The `n` largest groups. Fewer than `n` groups are returned as-is, without
/// padding. `n == 0` is rejected.
pub fn top_n<K: Clone>(counts: &[(K, usize)], n: usize) -> Result<Vec<(K, usize)>, EngineError> {
    if n == 0 {
        return Err(EngineError::invalid("top_n must be a positive integer"));
    }
    let mut ranked = rank_descending(counts);
    ranked.truncate(n);
    Ok(ranked)
}
