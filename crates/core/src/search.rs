use std::cmp::Ordering;

/// Positions of the `k` highest scores, best first. Equal scores keep their
/// original relative order, so the earlier position wins a tie.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    // Stable sort; NaN never reaches here because inputs are unit vectors.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descending_and_truncates() {
        let ranked = top_k(&[0.1, 0.9, 0.5], 2);
        assert_eq!(ranked, vec![(1, 0.9), (2, 0.5)]);
    }

    #[test]
    fn ties_prefer_earlier_position() {
        let ranked = top_k(&[0.5, 0.7, 0.7, 0.5], 4);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn k_larger_than_input_returns_everything() {
        assert_eq!(top_k(&[0.2, 0.1], 10).len(), 2);
    }
}
