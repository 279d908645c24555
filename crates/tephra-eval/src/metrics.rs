//! Ranking metrics over probability predictions.

/// One-vs-rest ROC-AUC for a single class.
///
/// `scores[i]` is the predicted probability of `class` for sample `i`;
/// `truths[i]` is the true class label. Computed from the Mann-Whitney U
/// statistic with tie-averaged ranks. Returns `None` when the holdout
/// contains no positive or no negative samples, since the curve is
/// undefined in that case.
#[must_use]
pub fn one_vs_rest_auc(truths: &[usize], scores: &[f64], class: usize) -> Option<f64> {
    let n_pos = truths.iter().filter(|&&t| t == class).count();
    let n_neg = truths.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // Sort sample indices by score, then assign tie-averaged ranks.
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the average rank of the run.
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = truths
        .iter()
        .zip(&ranks)
        .filter(|&(&t, _)| t == class)
        .map(|(_, &r)| r)
        .sum();
    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Macro-averaged one-vs-rest ROC-AUC over all classes.
///
/// Classes whose per-class AUC is undefined (no positives or no negatives
/// in the holdout) are skipped. Returns `None` when every class is
/// undefined.
#[must_use]
pub fn macro_auc(truths: &[usize], probabilities: &[Vec<f64>], n_classes: usize) -> Option<f64> {
    let defined: Vec<f64> = (0..n_classes)
        .filter_map(|class| {
            let scores: Vec<f64> = probabilities.iter().map(|p| p[class]).collect();
            one_vs_rest_auc(truths, &scores, class)
        })
        .collect();
    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Per-class precision (positive predictive value).
///
/// Entry `c` is `None` when class `c` was never predicted, since
/// TP / (TP + FP) is undefined without positive predictions.
#[must_use]
pub fn precision_per_class(
    truths: &[usize],
    predicted: &[usize],
    n_classes: usize,
) -> Vec<Option<f64>> {
    (0..n_classes)
        .map(|class| {
            let n_predicted = predicted.iter().filter(|&&p| p == class).count();
            if n_predicted == 0 {
                return None;
            }
            let tp = truths
                .iter()
                .zip(predicted)
                .filter(|&(&t, &p)| t == class && p == class)
                .count();
            Some(tp as f64 / n_predicted as f64)
        })
        .collect()
}

/// Macro-averaged precision over classes with at least one prediction.
///
/// Classes never predicted are skipped; `None` when no class was predicted
/// (possible only for an empty holdout).
#[must_use]
pub fn macro_precision(truths: &[usize], predicted: &[usize], n_classes: usize) -> Option<f64> {
    let defined: Vec<f64> = precision_per_class(truths, predicted, n_classes)
        .into_iter()
        .flatten()
        .collect();
    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Fraction of predictions matching the truth; `None` for empty input.
#[must_use]
pub fn accuracy(truths: &[usize], predicted: &[usize]) -> Option<f64> {
    if truths.is_empty() {
        return None;
    }
    let correct = truths.iter().zip(predicted).filter(|&(&t, &p)| t == p).count();
    Some(correct as f64 / truths.len() as f64)
}
