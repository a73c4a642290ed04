//! Tree-ensemble classifier stage (random-forest style probability averaging).

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A node of a binary decision tree.
///
/// Samples with `x[feature] <= threshold` go left. `cover` is the number (or
/// weight) of training samples that reached the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        /// Class distribution at the leaf.
        value: Vec<f64>,
        cover: f64,
    },
}

impl TreeNode {
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

/// A single decision tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Index of the leaf a row falls into.
    ///
    /// Assumes a validated tree, where children always follow their parent.
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut index = 0;
        while let TreeNode::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = &self.nodes[index]
        {
            index = if row[*feature] <= *threshold {
                *left
            } else {
                *right
            };
        }
        index
    }

    /// Class distribution of the leaf a row falls into.
    pub fn leaf_value(&self, row: &[f64]) -> &[f64] {
        match &self.nodes[self.leaf_index(row)] {
            TreeNode::Leaf { value, .. } => value.as_slice(),
            TreeNode::Split { .. } => &[],
        }
    }

    /// Cover-weighted mean leaf value of one class.
    pub fn expected_value(&self, class: usize) -> f64 {
        let root_cover = self.nodes[0].cover();
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Leaf { value, cover } => Some(value[class] * cover),
                TreeNode::Split { .. } => None,
            })
            .sum::<f64>()
            / root_cover
    }

    /// Maximum root-to-leaf depth, counting the root as 1.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        depths[0] = 1;
        let mut max = 1;
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                depths[*left] = depths[index] + 1;
                depths[*right] = depths[index] + 1;
                max = max.max(depths[index] + 1);
            }
        }
        max
    }

    fn validate(&self, tree_index: usize, n_features: usize, n_classes: usize) -> Result<(), ModelError> {
        let malformed = |msg: String| ModelError::Malformed(format!("tree {}: {}", tree_index, msg));

        if self.nodes.is_empty() {
            return Err(malformed("no nodes".to_string()));
        }

        let mut parents = vec![0usize; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if !(node.cover().is_finite() && node.cover() > 0.0) {
                return Err(malformed(format!("node {} has non-positive cover", index)));
            }
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    cover,
                } => {
                    if *feature >= n_features {
                        return Err(malformed(format!(
                            "node {} splits on feature {} of {}",
                            index, feature, n_features
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(malformed(format!("node {} has a NaN threshold", index)));
                    }
                    // Children after their parent rules out cycles
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(malformed(format!(
                                "node {} has invalid child {}",
                                index, child
                            )));
                        }
                        parents[child] += 1;
                    }
                    let children = self.nodes[*left].cover() + self.nodes[*right].cover();
                    if (children - cover).abs() > 1e-6 * cover.max(1.0) {
                        return Err(malformed(format!(
                            "node {} cover {} differs from its children's {}",
                            index, cover, children
                        )));
                    }
                }
                TreeNode::Leaf { value, .. } => {
                    if value.len() != n_classes {
                        return Err(malformed(format!(
                            "leaf {} has {} values for {} classes",
                            index,
                            value.len(),
                            n_classes
                        )));
                    }
                    if value.iter().any(|v| !(v.is_finite() && *v >= 0.0))
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return Err(malformed(format!("leaf {} has an invalid distribution", index)));
                    }
                }
            }
        }

        if parents.iter().skip(1).any(|&p| p != 1) {
            return Err(malformed("every non-root node needs exactly one parent".to_string()));
        }

        Ok(())
    }

    /// Rescale leaf values to sum to one (count-valued leaves become fractions).
    fn normalize_leaves(&mut self) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf { value, .. } = node {
                let total: f64 = value.iter().sum();
                value.iter_mut().for_each(|v| *v /= total);
            }
        }
    }
}

/// An ensemble of decision trees whose leaf distributions are averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Check structure and normalize leaves.
    pub fn prepare(&mut self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("ensemble has no trees".to_string()));
        }
        if self.n_classes == 0 {
            return Err(ModelError::Malformed("ensemble has no classes".to_string()));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.n_features, self.n_classes)?;
        }
        self.trees.iter_mut().for_each(DecisionTree::normalize_leaves);
        Ok(())
    }

    /// Mean of the trees' leaf distributions.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.leaf_value(row)) {
                *p += v;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}
