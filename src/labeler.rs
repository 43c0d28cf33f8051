use crate::dendrogram::MergeTree;

/// Sentinel for records that do not fall into any multi-record group.
pub const UNCLUSTERED: &str = "-1";

/// Labels for one threshold, indexed by leaf index within the partition.
#[derive(Debug, Clone)]
pub struct ThresholdLabels {
    pub labels: Vec<String>,
    pub max_dists: Vec<f64>,
}

/// Cut the tree at `eps`: a subtree whose merge distance is at or below the
/// threshold becomes one group labeled with its node id, except singletons,
/// which are never reported as their own group. The walk is depth-first over
/// an explicit stack and touches every leaf exactly once.
pub fn assign_groups(tree: &MergeTree, eps: f64) -> ThresholdLabels {
    let n = tree.leaf_count();
    let mut labels = vec![String::new(); n];
    let mut max_dists = vec![0.0_f64; n];

    let mut stack = vec![tree.root()];
    while let Some(slot) = stack.pop() {
        let node = tree.node(slot);
        if node.merge_distance <= eps {
            if node.size > 1 {
                for &member in &node.members {
                    labels[member] = node.id.clone();
                    max_dists[member] = node.merge_distance;
                }
            } else {
                labels[node.members[0]] = UNCLUSTERED.to_string();
                max_dists[node.members[0]] = 0.0;
            }
        } else if let (Some(left), Some(right)) = (node.left, node.right) {
            stack.push(left);
            stack.push(right);
        }
    }

    ThresholdLabels { labels, max_dists }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::MergeStep;
    use std::collections::{HashMap, HashSet};

    fn step(left: usize, right: usize, distance: f64, size: usize) -> MergeStep {
        MergeStep { left, right, distance, size }
    }

    /// ((0,1)@1, 2)@5 over three leaves
    fn three_leaf_tree() -> MergeTree {
        let steps = vec![step(0, 1, 1.0, 2), step(2, 3, 5.0, 3)];
        MergeTree::build(&steps, 3).unwrap()
    }

    #[test]
    fn test_tight_threshold_leaves_all_unclustered() {
        let tree = three_leaf_tree();
        let out = assign_groups(&tree, 0.0);
        assert_eq!(out.labels, vec!["-1", "-1", "-1"]);
        assert_eq!(out.max_dists, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_intermediate_threshold_groups_close_pair() {
        let tree = three_leaf_tree();
        let out = assign_groups(&tree, 1.0);
        assert_eq!(out.labels[0], out.labels[1]);
        assert_ne!(out.labels[0], UNCLUSTERED);
        assert_eq!(out.labels[2], UNCLUSTERED);
        assert_eq!(out.max_dists, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_loose_threshold_collapses_to_root_group() {
        let tree = three_leaf_tree();
        let out = assign_groups(&tree, 10.0);
        assert_eq!(out.labels, vec!["1", "1", "1"]);
        assert_eq!(out.max_dists, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_every_leaf_gets_exactly_one_label() {
        let steps = vec![
            step(0, 1, 1.0, 2),
            step(2, 3, 1.5, 2),
            step(5, 6, 3.0, 4),
            step(4, 7, 9.0, 5),
        ];
        let tree = MergeTree::build(&steps, 5).unwrap();
        for eps in [0.0, 1.0, 1.5, 3.0, 9.0, 100.0] {
            let out = assign_groups(&tree, eps);
            assert_eq!(out.labels.len(), 5);
            assert!(out.labels.iter().all(|l| !l.is_empty()), "unlabeled leaf at eps {}", eps);
        }
    }

    #[test]
    fn test_groups_only_merge_as_threshold_grows() {
        let steps = vec![
            step(0, 1, 1.0, 2),
            step(2, 3, 1.5, 2),
            step(5, 6, 3.0, 4),
            step(4, 7, 9.0, 5),
        ];
        let tree = MergeTree::build(&steps, 5).unwrap();

        let grid = [0.0, 1.0, 1.5, 3.0, 9.0];
        for pair in grid.windows(2) {
            let tight = assign_groups(&tree, pair[0]);
            let loose = assign_groups(&tree, pair[1]);

            // Each tight group must land inside exactly one loose group
            let mut tight_groups: HashMap<&str, Vec<usize>> = HashMap::new();
            for (leaf, label) in tight.labels.iter().enumerate() {
                if label != UNCLUSTERED {
                    tight_groups.entry(label).or_default().push(leaf);
                }
            }
            for (label, members) in tight_groups {
                let covering: HashSet<&str> =
                    members.iter().map(|&m| loose.labels[m].as_str()).collect();
                assert_eq!(
                    covering.len(),
                    1,
                    "group {} split between thresholds {} and {}",
                    label,
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_max_dist_is_zero_exactly_when_unclustered() {
        let steps = vec![step(0, 1, 2.0, 2), step(2, 3, 4.0, 3)];
        let tree = MergeTree::build(&steps, 3).unwrap();
        for eps in [0.0, 2.0, 4.0] {
            let out = assign_groups(&tree, eps);
            for (label, dist) in out.labels.iter().zip(&out.max_dists) {
                if label == UNCLUSTERED {
                    assert_eq!(*dist, 0.0);
                } else {
                    assert!(*dist > 0.0);
                }
            }
        }
    }
}
