//! Exact TreeSHAP additive attributions for tree ensembles.
//!
//! Implements the polynomial-time path algorithm of Lundberg et al. (2020),
//! "From local explanations to global understanding with explainable AI for
//! trees". Node covers stand in for the background distribution, so the
//! baseline of each class is the cover-weighted expected leaf value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ExplainabilityError;
use crate::model::{Classifier, DecisionTree, TreeEnsemble, TreeNode};

/// Settings for the attribution backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Fail when baseline + contributions misses the model output.
    ///
    /// Off by default: leaf rounding in exported artifacts can leave a small
    /// residual, so additivity is reported as a tolerance, not guaranteed.
    pub check_additivity: bool,
    /// Largest accepted absolute residual when checking additivity.
    pub tolerance: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            check_additivity: false,
            tolerance: 1e-6,
        }
    }
}

/// Attribution of one class's probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAttribution {
    pub class_label: String,
    /// Expected model output for this class.
    pub baseline: f64,
    /// Contribution of each encoded feature.
    pub contributions: IndexMap<String, f64>,
    /// Model output for this class on the explained row.
    pub model_output: f64,
}

impl ClassAttribution {
    /// `baseline + sum(contributions) - model_output`.
    pub fn residual(&self) -> f64 {
        self.baseline + self.contributions.values().sum::<f64>() - self.model_output
    }
}

/// Per-class additive attributions for one explained row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveAttribution {
    /// Encoded feature names.
    pub feature_names: Vec<String>,
    /// Encoded row that was explained.
    pub encoded_values: Vec<f64>,
    /// Human-readable feature values of the explained row.
    pub feature_values: Vec<String>,
    pub classes: Vec<ClassAttribution>,
    pub additivity_checked: bool,
}

impl AdditiveAttribution {
    pub fn for_class(&self, label: &str) -> Option<&ClassAttribution> {
        self.classes.iter().find(|c| c.class_label == label)
    }
}

/// TreeSHAP over a tree ensemble classifier stage.
pub struct TreeExplainer<'a> {
    forest: &'a TreeEnsemble,
    expected_values: Vec<f64>,
}

impl<'a> TreeExplainer<'a> {
    /// Create an explainer; fails for classifier stages without trees.
    pub fn new(classifier: &'a dyn Classifier) -> Result<Self, ExplainabilityError> {
        let forest = classifier
            .tree_ensemble()
            .ok_or_else(|| ExplainabilityError::UnsupportedModel {
                backend: "TreeSHAP".to_string(),
                model: classifier.name().to_string(),
            })?;

        let n_trees = forest.trees.len() as f64;
        let expected_values = (0..forest.n_classes)
            .map(|class| {
                forest
                    .trees
                    .iter()
                    .map(|t| t.expected_value(class))
                    .sum::<f64>()
                    / n_trees
            })
            .collect();

        Ok(Self {
            forest,
            expected_values,
        })
    }

    /// Baseline (expected output) per class.
    pub fn expected_values(&self) -> &[f64] {
        &self.expected_values
    }

    /// SHAP values for one encoded row, indexed `[feature][class]`.
    pub fn shap_values(&self, row: &[f64]) -> Vec<Vec<f64>> {
        let mut phi = vec![vec![0.0; self.forest.n_classes]; self.forest.n_features];
        let scale = 1.0 / self.forest.trees.len() as f64;
        let capacity = self.forest.max_depth() + 2;

        for tree in &self.forest.trees {
            let walk = TreeWalk {
                tree,
                row,
                scale,
            };
            walk.recurse(0, Vec::with_capacity(capacity), 1.0, 1.0, None, &mut phi);
        }
        phi
    }

    /// Full attribution for every class.
    pub fn explain(
        &self,
        row: &[f64],
        feature_names: &[String],
        feature_values: Vec<String>,
        class_labels: &[String],
        config: &AttributionConfig,
    ) -> Result<AdditiveAttribution, ExplainabilityError> {
        let phi = self.shap_values(row);
        let outputs = self.forest.predict_proba(row);

        let mut classes = Vec::with_capacity(class_labels.len());
        for (class, label) in class_labels.iter().enumerate() {
            let contributions = feature_names
                .iter()
                .zip(&phi)
                .map(|(name, values)| (name.clone(), values[class]))
                .collect();
            let attribution = ClassAttribution {
                class_label: label.clone(),
                baseline: self.expected_values[class],
                contributions,
                model_output: outputs[class],
            };

            let residual = attribution.residual();
            if config.check_additivity && residual.abs() > config.tolerance {
                return Err(ExplainabilityError::AdditivityViolation {
                    class_label: label.clone(),
                    residual,
                    tolerance: config.tolerance,
                });
            }
            tracing::trace!(class = %label, residual, "additivity residual");
            classes.push(attribution);
        }

        Ok(AdditiveAttribution {
            feature_names: feature_names.to_vec(),
            encoded_values: row.to_vec(),
            feature_values,
            classes,
            additivity_checked: config.check_additivity,
        })
    }
}

/// One element of the unique feature path from the root to the current node.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` marks the root placeholder.
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

struct TreeWalk<'a> {
    tree: &'a DecisionTree,
    row: &'a [f64],
    scale: f64,
}

impl TreeWalk<'_> {
    fn recurse(
        &self,
        node: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
        phi: &mut [Vec<f64>],
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match &self.tree.nodes[node] {
            TreeNode::Leaf { value, .. } => {
                for index in 1..path.len() {
                    let element = path[index];
                    let Some(f) = element.feature else { continue };
                    let weight = unwound_path_sum(&path, index)
                        * (element.one_fraction - element.zero_fraction)
                        * self.scale;
                    for (out, v) in phi[f].iter_mut().zip(value) {
                        *out += weight * v;
                    }
                }
            }
            TreeNode::Split {
                feature: split,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = if self.row[*split] <= *threshold {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                let hot_zero = self.tree.nodes[hot].cover() / cover;
                let cold_zero = self.tree.nodes[cold].cover() / cover;

                // A feature seen earlier on the path is merged, not repeated
                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = path.iter().position(|e| e.feature == Some(*split)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    hot_zero * incoming_zero,
                    incoming_one,
                    Some(*split),
                    phi,
                );
                self.recurse(
                    cold,
                    path,
                    cold_zero * incoming_zero,
                    0.0,
                    Some(*split),
                    phi,
                );
            }
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one = path[depth].weight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next_one * denom / ((i + 1) as f64 * one);
            next_one = tmp - path[i].weight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].weight = path[i].weight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next_one = path[depth].weight;
    let mut total = 0.0;

    if one != 0.0 {
        for i in (0..depth).rev() {
            let tmp = next_one / ((i + 1) as f64 * one);
            total += tmp;
            next_one = path[i].weight - tmp * zero * (depth - i) as f64;
        }
    } else if zero != 0.0 {
        for i in (0..depth).rev() {
            total += path[i].weight / (zero * (depth - i) as f64);
        }
    }

    total * (depth + 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassifierStage, LinearClassifier, fixtures};

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    fn stump_forest() -> ClassifierStage {
        let mut forest = TreeEnsemble {
            n_features: 2,
            n_classes: 2,
            trees: vec![DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                        cover: 100.0,
                    },
                    TreeNode::Leaf {
                        value: vec![1.0, 0.0],
                        cover: 50.0,
                    },
                    TreeNode::Leaf {
                        value: vec![0.0, 1.0],
                        cover: 50.0,
                    },
                ],
            }],
        };
        forest.prepare().unwrap();
        ClassifierStage::RandomForest(forest)
    }

    #[test]
    fn test_single_split_attribution() {
        let stage = stump_forest();
        let explainer = TreeExplainer::new(&stage).unwrap();

        assert_eq!(explainer.expected_values(), &[0.5, 0.5]);
        let phi = explainer.shap_values(&[0.3, 7.0]);
        assert!((phi[0][0] - 0.5).abs() < 1e-12);
        assert!((phi[0][1] + 0.5).abs() < 1e-12);
        // Unused feature gets nothing
        assert_eq!(phi[1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_penguin_attributions_are_additive() {
        let pipeline = fixtures::penguin_pipeline();
        let explainer = TreeExplainer::new(&pipeline.classifier).unwrap();
        let config = AttributionConfig {
            check_additivity: true,
            tolerance: 1e-9,
        };

        for row in [
            [0.0, 1.0, 45.0, 15.0, 200.0, 4000.0],
            [2.0, 0.0, 38.0, 18.5, 185.0, 3500.0],
            [1.0, 1.0, 50.0, 19.0, 196.0, 4800.0],
        ] {
            let attribution = explainer
                .explain(
                    &row,
                    &pipeline.encoder.encoded_columns(),
                    vec![String::new(); 6],
                    &pipeline.class_labels,
                    &config,
                )
                .unwrap();
            assert_eq!(attribution.classes.len(), 3);
            for class in &attribution.classes {
                assert!(class.residual().abs() < 1e-9, "{}", class.residual());
            }
        }
    }

    #[test]
    fn test_repeated_feature_on_path() {
        // Feature 0 is split twice on the same path
        let mut forest = TreeEnsemble {
            n_features: 1,
            n_classes: 2,
            trees: vec![DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                        cover: 10.0,
                    },
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.2,
                        left: 3,
                        right: 4,
                        cover: 6.0,
                    },
                    TreeNode::Leaf {
                        value: vec![0.0, 1.0],
                        cover: 4.0,
                    },
                    TreeNode::Leaf {
                        value: vec![1.0, 0.0],
                        cover: 2.0,
                    },
                    TreeNode::Leaf {
                        value: vec![0.5, 0.5],
                        cover: 4.0,
                    },
                ],
            }],
        };
        forest.prepare().unwrap();
        let stage = ClassifierStage::RandomForest(forest);
        let explainer = TreeExplainer::new(&stage).unwrap();

        let row = [0.1];
        let phi = explainer.shap_values(&row);
        let output = stage.predict_proba(&row);
        // With one feature, its SHAP value is the whole deviation
        for class in 0..2 {
            let expected = output[class] - explainer.expected_values()[class];
            assert!((phi[0][class] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_stage_is_unsupported() {
        let stage = ClassifierStage::LogisticRegression(LinearClassifier {
            coefficients: vec![vec![1.0], vec![-1.0]],
            intercepts: vec![0.0, 0.0],
        });
        let err = TreeExplainer::new(&stage).err().unwrap();
        assert!(matches!(err, ExplainabilityError::UnsupportedModel { .. }));
    }

    #[test]
    fn test_additivity_violation_reported() {
        let stage = stump_forest();
        let explainer = TreeExplainer::new(&stage).unwrap();
        // A negative tolerance makes any residual a violation
        let config = AttributionConfig {
            check_additivity: true,
            tolerance: -1.0,
        };
        let err = explainer
            .explain(&[0.3, 0.0], &names(2), vec![], &["a".to_string(), "b".to_string()], &config)
            .unwrap_err();
        assert!(matches!(err, ExplainabilityError::AdditivityViolation { .. }));
    }
}
