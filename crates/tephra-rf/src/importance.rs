//! Ranked mean-decrease-in-impurity feature importance.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Normalize summed impurity decreases and rank them descending.
pub(crate) fn rank_importances(totals: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let sum: f64 = totals.iter().sum();
    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, &total)| RankedFeature {
            name: name.clone(),
            importance: if sum > 0.0 { total / sum } else { 0.0 },
            rank: 0,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in ranked.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_descend_by_importance() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_importances(&[1.0, 3.0, 2.0], &names);
        assert_eq!(ranked[0].name, "b");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].name, "a");
        assert_eq!(ranked[2].rank, 3);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_zero_totals_stay_zero() {
        let names = vec!["a".to_string(), "b".to_string()];
        let ranked = rank_importances(&[0.0, 0.0], &names);
        assert!(ranked.iter().all(|f| f.importance == 0.0));
    }
}
