//! CART decision tree growth with Gini impurity.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Stopping and subsampling parameters shared by every tree in a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// A tree node. Children are stored before their parent, so the root is
/// always the last node in the arena.
#[derive(Debug, Clone)]
pub(crate) enum TreeNode {
    Leaf {
        /// Normalized class distribution of the training rows in this leaf.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        /// Impurity decrease weighted by the node's sample fraction (MDI).
        gain: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted decision tree over column-major training data.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<TreeNode>,
    root: usize,
    n_classes: usize,
}

impl Tree {
    /// Return the leaf class distribution for one sample.
    pub(crate) fn predict_proba(&self, sample: &[f64]) -> &[f64] {
        let mut idx = self.root;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Accumulate this tree's per-feature impurity decreases into `totals`.
    pub(crate) fn accumulate_gains(&self, totals: &mut [f64]) {
        for node in &self.nodes {
            if let TreeNode::Split { feature, gain, .. } = node {
                totals[*feature] += gain;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub(crate) fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Gini impurity of a class count vector.
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// The best axis-aligned split found for one node, if any.
struct Candidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Grow a tree on column-major features, restricted to `indices`.
///
/// `columns[feature][sample]` holds the full dataset; `indices` selects the
/// (bootstrap) rows this tree trains on and may contain repeats.
pub(crate) fn grow(
    columns: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    n_classes: usize,
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
) -> Tree {
    let mut nodes = Vec::new();
    let n_root = indices.len();
    let root = grow_node(
        columns, labels, indices, n_classes, n_root, params, 0, rng, &mut nodes,
    );
    Tree {
        nodes,
        root,
        n_classes,
    }
}

/// Recursively grow one node, pushing children into the arena before the
/// parent, and return the new node's index.
#[allow(clippy::too_many_arguments)]
fn grow_node(
    columns: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    n_classes: usize,
    n_root: usize,
    params: &TreeParams,
    depth: usize,
    rng: &mut ChaCha8Rng,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let n = indices.len();
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[labels[i]] += 1;
    }
    let impurity = gini(&counts, n);

    let stop = impurity == 0.0
        || n < params.min_samples_split
        || params.max_depth.is_some_and(|d| depth >= d);

    let candidate = if stop {
        None
    } else {
        best_split(columns, labels, indices, n_classes, impurity, params, rng)
    };

    match candidate {
        None => {
            let total = n as f64;
            nodes.push(TreeNode::Leaf {
                distribution: counts.iter().map(|&c| c as f64 / total).collect(),
            });
            nodes.len() - 1
        }
        Some(c) => {
            let left = grow_node(
                columns, labels, &c.left, n_classes, n_root, params, depth + 1, rng, nodes,
            );
            let right = grow_node(
                columns, labels, &c.right, n_classes, n_root, params, depth + 1, rng, nodes,
            );
            nodes.push(TreeNode::Split {
                feature: c.feature,
                threshold: c.threshold,
                gain: (n as f64 / n_root as f64) * c.decrease,
                left,
                right,
            });
            nodes.len() - 1
        }
    }
}

/// Exhaustive best-split search over a random feature subset.
///
/// For each of `max_features` features chosen without replacement, sorts
/// the node's `(value, label)` pairs and scans every boundary between
/// distinct values, tracking the split with the largest impurity decrease.
fn best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    indices: &[usize],
    n_classes: usize,
    parent_impurity: f64,
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
) -> Option<Candidate> {
    let n = indices.len();
    let n_features = columns.len();

    // Partial Fisher-Yates: only the first `max_features` slots are needed.
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = params.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, decrease)

    for &feature in order.iter().take(take) {
        let mut pairs: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (columns[feature][i], labels[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = vec![0usize; n_classes];
        for &(_, label) in &pairs {
            right_counts[label] += 1;
        }

        for cut in 1..n {
            let (value, label) = pairs[cut - 1];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            // Only cut between distinct values.
            if value == pairs[cut].0 {
                continue;
            }
            if cut < params.min_samples_leaf || n - cut < params.min_samples_leaf {
                continue;
            }

            let n_left = cut as f64;
            let n_right = (n - cut) as f64;
            let child_impurity = (n_left * gini(&left_counts, cut)
                + n_right * gini(&right_counts, n - cut))
                / n as f64;
            let decrease = parent_impurity - child_impurity;

            if best.is_none_or(|(_, _, d)| decrease > d) {
                best = Some((feature, (value + pairs[cut].0) / 2.0, decrease));
            }
        }
    }

    let (feature, threshold, decrease) = best?;
    if decrease <= 0.0 {
        return None;
    }

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| columns[feature][i] <= threshold);
    Some(Candidate {
        feature,
        threshold,
        decrease,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn columns_from_rows(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n_features = rows[0].len();
        (0..n_features)
            .map(|f| rows.iter().map(|r| r[f]).collect())
            .collect()
    }

    fn default_params(max_features: usize) -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    #[test]
    fn pure_node_is_single_leaf() {
        let columns = columns_from_rows(&[vec![1.0], vec![2.0], vec![3.0]]);
        let labels = vec![1, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = grow(&columns, &labels, &[0, 1, 2], 2, &default_params(1), &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_proba(&[2.0]), &[0.0, 1.0]);
    }

    #[test]
    fn separable_data_splits_correctly() {
        let columns = columns_from_rows(&[
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ]);
        let labels = vec![0, 0, 0, 1, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let tree = grow(
            &columns,
            &labels,
            &[0, 1, 2, 3, 4, 5],
            2,
            &default_params(1),
            &mut rng,
        );
        assert_eq!(tree.predict_proba(&[2.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[11.0]), &[0.0, 1.0]);
    }

    #[test]
    fn leaf_distribution_sums_to_one() {
        let columns = columns_from_rows(&[vec![1.0], vec![1.0], vec![1.0], vec![1.0]]);
        // Identical values cannot be split: one mixed leaf.
        let labels = vec![0, 0, 1, 2];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = grow(&columns, &labels, &[0, 1, 2, 3], 3, &default_params(1), &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_classes(), 3);
        let sum: f64 = tree.predict_proba(&[1.0]).iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn max_depth_zero_splits() {
        let columns = columns_from_rows(&[vec![1.0], vec![10.0]]);
        let labels = vec![0, 1];
        let params = TreeParams {
            max_depth: Some(0),
            ..default_params(1)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = grow(&columns, &labels, &[0, 1], 2, &params, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn gains_accumulate_by_feature() {
        let columns = columns_from_rows(&[
            vec![1.0, 5.0],
            vec![2.0, 5.0],
            vec![10.0, 5.0],
            vec![11.0, 5.0],
        ]);
        let labels = vec![0, 0, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = grow(&columns, &labels, &[0, 1, 2, 3], 2, &default_params(2), &mut rng);
        let mut totals = vec![0.0; 2];
        tree.accumulate_gains(&mut totals);
        // The constant second feature can never be chosen.
        assert!(totals[0] > 0.0);
        assert_eq!(totals[1], 0.0);
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[], 0), 0.0);
    }
}
