use std::cmp::Ordering;

use super::types::{ScoredPassage, Similarity};

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Score in `[0, 1]` for the given metric, higher meaning more similar.
///
/// Cosine and dot product map `[-1, 1]` onto `[0, 1]` via `(1 + s) / 2`
/// (dot product assumes unit-length vectors); euclidean uses `1 / (1 + d)`.
pub fn normalized_score(similarity: Similarity, query: &[f32], candidate: &[f32]) -> f32 {
    match similarity {
        Similarity::Cosine => (1.0 + cosine_similarity(query, candidate)) / 2.0,
        Similarity::DotProduct => (1.0 + dot_product(query, candidate)) / 2.0,
        Similarity::Euclidean => 1.0 / (1.0 + euclidean_distance(query, candidate)),
    }
}

/// Highest score first; ties keep insertion order.
pub fn sort_by_score_desc(results: &mut [ScoredPassage]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Rank `(body, vector)` candidates, keep the `num_candidates` best as the
/// pool and return the top `limit` of it.
pub fn rank_candidates<'a, I>(
    similarity: Similarity,
    query: &[f32],
    candidates: I,
    num_candidates: usize,
    limit: usize,
) -> Vec<ScoredPassage>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scored: Vec<ScoredPassage> = candidates
        .into_iter()
        .filter(|(_, vector)| vector.len() == query.len())
        .map(|(body, vector)| ScoredPassage {
            body: body.to_string(),
            score: normalized_score(similarity, query, vector),
        })
        .collect();

    sort_by_score_desc(&mut scored);
    scored.truncate(num_candidates);
    scored.truncate(limit);
    scored
}
