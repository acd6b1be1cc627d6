use serde::{Deserialize, Serialize};

/// A node in a weak decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal split node on one feature component.
    Split {
        feature: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Leaf node holding the signed vote of this tree.
    Leaf { value: f32 },
}

/// A single weak learner of a boosted ensemble.
///
/// The tree scores a feature vector by:
/// 1. Starting at the root node
/// 2. At each split, reading one feature component
/// 3. Going left if value <= threshold, right otherwise
/// 4. Returning the signed value at the reached leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Create a new tree with the given nodes. Node 0 is the root.
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// A single split on `feature` with a leaf on each side.
    pub fn stump(feature: u32, threshold: f32, below: f32, above: f32) -> Self {
        Self::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: below },
            TreeNode::Leaf { value: above },
        ])
    }

    /// A tree that votes the same value for every input.
    pub fn constant(value: f32) -> Self {
        Self::new(vec![TreeNode::Leaf { value }])
    }

    /// Traverse the tree and return the leaf value.
    ///
    /// Expects a tree that passed [`DecisionTree::check`] against a feature
    /// count no larger than `features.len()`.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut node_idx = 0usize;

        loop {
            match &self.nodes[node_idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node_idx = if features[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                TreeNode::Leaf { value } => {
                    return *value;
                }
            }
        }
    }

    /// Get the number of nodes in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get the depth of the tree.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        self.depth_from(0)
    }

    fn depth_from(&self, node_idx: usize) -> usize {
        match &self.nodes[node_idx] {
            TreeNode::Split { left, right, .. } => {
                1 + self
                    .depth_from(*left as usize)
                    .max(self.depth_from(*right as usize))
            }
            TreeNode::Leaf { .. } => 1,
        }
    }

    /// Verify the tree can be evaluated on vectors of `num_features`
    /// components.
    ///
    /// Children must come after their parent, which rules out cycles and
    /// guarantees traversal terminates.
    pub fn check(&self, num_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature as usize >= num_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            idx, feature, num_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has non-finite threshold", idx));
                    }
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A weak learner with its boosting weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTree {
    pub weight: f32,
    pub tree: DecisionTree,
}

impl WeightedTree {
    pub fn new(weight: f32, tree: DecisionTree) -> Self {
        Self { weight, tree }
    }
}

/// A weighted sum of weak decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<WeightedTree>,
}

impl TreeEnsemble {
    pub fn new(trees: Vec<WeightedTree>) -> Self {
        Self { trees }
    }

    /// Sum every tree's weighted vote.
    pub fn predict(&self, features: &[f32]) -> f32 {
        self.trees
            .iter()
            .map(|t| t.weight * t.tree.predict(features))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_tree_traversal() {
        // Create a simple tree:
        //        [0: split]
        //       /          \
        //   [1: leaf]   [2: leaf]
        let tree = DecisionTree::stump(1, 0.5, -1.0, 1.0);

        // value <= threshold => go left
        assert_eq!(tree.predict(&[9.0, 0.5]), -1.0);
        assert_eq!(tree.predict(&[9.0, 0.2]), -1.0);

        // value > threshold => go right
        assert_eq!(tree.predict(&[-9.0, 0.7]), 1.0);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.num_nodes(), 3);
    }

    #[test]
    fn deeper_tree_traversal() {
        //          [0: f0 <= 1]
        //         /            \
        //   [1: f1 <= 0]     [2: leaf 3]
        //    /      \
        // [3: -2]  [4: 2]
        let tree = DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 1,
                right: 2,
            },
            TreeNode::Split {
                feature: 1,
                threshold: 0.0,
                left: 3,
                right: 4,
            },
            TreeNode::Leaf { value: 3.0 },
            TreeNode::Leaf { value: -2.0 },
            TreeNode::Leaf { value: 2.0 },
        ]);

        assert_eq!(tree.predict(&[0.0, -1.0]), -2.0);
        assert_eq!(tree.predict(&[0.0, 1.0]), 2.0);
        assert_eq!(tree.predict(&[5.0, -1.0]), 3.0);
        assert_eq!(tree.depth(), 3);
        assert!(tree.check(2).is_ok());
    }

    #[test]
    fn ensemble_sums_weighted_votes() {
        let ensemble = TreeEnsemble::new(vec![
            WeightedTree::new(0.5, DecisionTree::constant(1.0)),
            WeightedTree::new(2.0, DecisionTree::stump(0, 0.0, -1.0, 1.0)),
        ]);

        assert!((ensemble.predict(&[1.0]) - 2.5).abs() < 1e-6);
        assert!((ensemble.predict(&[-1.0]) - (-1.5)).abs() < 1e-6);
    }

    #[test]
    fn check_rejects_malformed_trees() {
        assert!(DecisionTree::new(vec![]).check(4).is_err());
        assert!(DecisionTree::stump(4, 0.0, -1.0, 1.0).check(4).is_err());
        assert!(DecisionTree::stump(0, f32::NAN, -1.0, 1.0).check(4).is_err());
        assert!(DecisionTree::constant(f32::INFINITY).check(4).is_err());

        let cyclic = DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf { value: 1.0 },
        ]);
        assert!(cyclic.check(1).is_err());

        let dangling = DecisionTree::new(vec![TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: 1,
            right: 2,
        }]);
        assert!(dangling.check(1).is_err());
    }
}
