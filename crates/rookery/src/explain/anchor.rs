//! Anchor rule search (Ribeiro et al., 2018).
//!
//! Candidate predicates come from the instance: equality on categorical codes
//! and quartile bins on numeric columns. Rules grow by beam search, with
//! KL-LUCB picking the most precise candidates under a sampling budget.
//! Perturbations are drawn from the reference rows, with every feature a rule
//! constrains resampled among reference values that satisfy it.

use std::fmt;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ExplainabilityError, ModelError};
use crate::model::{Classifier, EncodedFeatures};
use crate::profile::quantile_sorted;

/// Settings for the rule backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Minimum precision a rule must reach.
    pub threshold: f64,
    /// Confidence parameter of the precision bounds.
    pub delta: f64,
    /// Tolerance of the precision bounds.
    pub epsilon: f64,
    /// Perturbations drawn per sampling round.
    pub batch_size: usize,
    /// Candidates kept at each rule size.
    pub beam_size: usize,
    /// Longest rule considered; defaults to every candidate predicate.
    pub max_anchor_size: Option<usize>,
    /// Sampling budget per candidate rule.
    pub max_samples: usize,
    /// Reference rows used to estimate coverage.
    pub coverage_samples: usize,
    /// Wall-clock budget for one search.
    pub timeout_ms: u64,
    pub seed: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            delta: 0.1,
            epsilon: 0.15,
            batch_size: 100,
            beam_size: 2,
            max_anchor_size: None,
            max_samples: 5000,
            coverage_samples: 10_000,
            timeout_ms: 10_000,
            seed: 42,
        }
    }
}

/// Comparison used by a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<=")]
    Leq,
    #[serde(rename = ">")]
    Gt,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Leq => "<=",
            Operator::Gt => ">",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Category(String),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Number(n) => write!(f, "{:.2}", n),
            ConditionValue::Category(c) => f.write_str(c),
        }
    }
}

/// One human-readable condition of a rule, e.g. `flipper_length_mm > 197.00`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.feature, self.operator, self.value)
    }
}

/// A sufficient rule for the prediction, with its measured quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExplanation {
    /// Conjunction of conditions; empty means the prediction holds anywhere.
    pub conditions: Vec<Condition>,
    /// Fraction of perturbations satisfying the rule that keep the prediction.
    pub precision: f64,
    /// Fraction of reference rows satisfying the rule.
    pub coverage: f64,
    pub predicted_class: String,
    pub samples_drawn: usize,
}

impl RuleExplanation {
    /// `IF a AND b THEN PREDICT class`.
    pub fn describe(&self) -> String {
        let body = if self.conditions.is_empty() {
            "ANY".to_string()
        } else {
            self.conditions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        format!("IF {} THEN PREDICT {}", body, self.predicted_class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Test {
    Eq(f64),
    Leq(f64),
    Gt(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Predicate {
    feature: usize,
    test: Test,
}

impl Predicate {
    fn holds(&self, value: f64) -> bool {
        match self.test {
            Test::Eq(v) => value == v,
            Test::Leq(v) => value <= v,
            Test::Gt(v) => value > v,
        }
    }
}

/// Rule explainer over an encoded reference sample.
pub struct AnchorExplainer<'a> {
    classifier: &'a dyn Classifier,
    class_labels: &'a [String],
    reference: &'a EncodedFeatures,
    /// Encoded column index to category names, for categorical columns.
    categorical_names: IndexMap<usize, Vec<String>>,
}

impl<'a> AnchorExplainer<'a> {
    pub fn new(
        classifier: &'a dyn Classifier,
        class_labels: &'a [String],
        reference: &'a EncodedFeatures,
        categorical_names: IndexMap<usize, Vec<String>>,
    ) -> Result<Self, ExplainabilityError> {
        if reference.is_empty() {
            return Err(ExplainabilityError::Reference(
                "reference sample has no rows".to_string(),
            ));
        }
        if reference.n_columns() != classifier.n_features() {
            return Err(ExplainabilityError::Reference(format!(
                "reference has {} columns but the classifier expects {}",
                reference.n_columns(),
                classifier.n_features()
            )));
        }
        if let Some(index) = categorical_names.keys().find(|i| **i >= reference.n_columns()) {
            return Err(ExplainabilityError::Reference(format!(
                "categorical column {} is outside the encoded width",
                index
            )));
        }
        Ok(Self {
            classifier,
            class_labels,
            reference,
            categorical_names,
        })
    }

    /// Search a rule that keeps `instance`'s prediction with the configured precision.
    pub fn explain(
        &self,
        instance: &[f64],
        config: &AnchorConfig,
    ) -> Result<RuleExplanation, ExplainabilityError> {
        if !(config.threshold > 0.0 && config.threshold <= 1.0) {
            return Err(ExplainabilityError::InvalidThreshold(config.threshold));
        }
        let target = self.classifier.predict(instance);
        let predicted_class = self.class_labels.get(target).cloned().ok_or_else(|| {
            ModelError::InvalidProbabilities(format!("no label for class {}", target))
        })?;
        let predicates = self.candidate_predicates(instance);
        let started = Instant::now();

        let mut search = Search {
            explainer: self,
            instance,
            target,
            predicates: &predicates,
            config,
            rng: fastrand::Rng::with_seed(config.seed),
            deadline: started + Duration::from_millis(config.timeout_ms),
            samples_drawn: 0,
            coverage_rows: Vec::new(),
        };
        search.coverage_rows = search.draw_coverage_rows();

        let anchor = search.run()?;
        tracing::debug!(
            conditions = anchor.predicates.len(),
            precision = anchor.precision(),
            coverage = anchor.coverage,
            samples = search.samples_drawn,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "anchor search finished"
        );

        Ok(RuleExplanation {
            conditions: anchor
                .predicates
                .iter()
                .map(|&p| self.condition(&predicates[p]))
                .collect(),
            precision: anchor.precision(),
            coverage: anchor.coverage,
            predicted_class,
            samples_drawn: search.samples_drawn,
        })
    }

    fn candidate_predicates(&self, instance: &[f64]) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        for (feature, &value) in instance.iter().enumerate() {
            if self.categorical_names.contains_key(&feature) {
                predicates.push(Predicate {
                    feature,
                    test: Test::Eq(value),
                });
                continue;
            }

            let mut sorted: Vec<f64> = self.reference.column(feature).collect();
            sorted.sort_by(f64::total_cmp);
            let mut boundaries: Vec<f64> = [0.25, 0.5, 0.75]
                .iter()
                .map(|q| quantile_sorted(&sorted, *q))
                .collect();
            boundaries.dedup();

            // Tightest quartile bin containing the value
            if let Some(&upper) = boundaries.iter().find(|b| value <= **b) {
                predicates.push(Predicate {
                    feature,
                    test: Test::Leq(upper),
                });
            }
            if let Some(&lower) = boundaries.iter().rev().find(|b| value > **b) {
                predicates.push(Predicate {
                    feature,
                    test: Test::Gt(lower),
                });
            }
        }
        predicates
    }

    fn condition(&self, predicate: &Predicate) -> Condition {
        let feature = self
            .reference
            .columns
            .get(predicate.feature)
            .cloned()
            .unwrap_or_else(|| predicate.feature.to_string());
        match predicate.test {
            Test::Eq(code) => {
                let value = self
                    .categorical_names
                    .get(&predicate.feature)
                    .and_then(|names| names.get(code as usize))
                    .map(|name| ConditionValue::Category(name.clone()))
                    .unwrap_or(ConditionValue::Number(code));
                Condition {
                    feature,
                    operator: Operator::Eq,
                    value,
                }
            }
            Test::Leq(v) => Condition {
                feature,
                operator: Operator::Leq,
                value: ConditionValue::Number(v),
            },
            Test::Gt(v) => Condition {
                feature,
                operator: Operator::Gt,
                value: ConditionValue::Number(v),
            },
        }
    }
}

/// Sampling statistics of one candidate rule.
#[derive(Debug, Clone)]
struct Candidate {
    /// Sorted indices into the predicate list.
    predicates: Vec<usize>,
    samples: usize,
    positives: usize,
    coverage: f64,
}

impl Candidate {
    fn precision(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.positives as f64 / self.samples as f64
        }
    }
}

struct Search<'s, 'a> {
    explainer: &'s AnchorExplainer<'a>,
    instance: &'s [f64],
    target: usize,
    predicates: &'s [Predicate],
    config: &'s AnchorConfig,
    rng: fastrand::Rng,
    deadline: Instant,
    samples_drawn: usize,
    coverage_rows: Vec<usize>,
}

impl Search<'_, '_> {
    fn run(&mut self) -> Result<Candidate, ExplainabilityError> {
        let config = self.config;

        // The prediction may hold no matter what
        let mut empty = self.candidate(Vec::new());
        self.sample(&mut empty, config.batch_size.max(1))?;
        let beta = (1.0 / config.delta).ln();
        let lower = lower_bound(empty.precision(), beta / empty.samples as f64);
        if empty.precision() >= config.threshold && lower > config.threshold - config.epsilon {
            return Ok(empty);
        }

        let max_size = config
            .max_anchor_size
            .unwrap_or(self.predicates.len())
            .min(self.predicates.len());
        let mut best_precision = empty.precision();
        let mut beam: Vec<Vec<usize>> = vec![Vec::new()];

        for size in 1..=max_size {
            let mut candidates: Vec<Candidate> = self
                .extend_beam(&beam)
                .into_iter()
                .map(|predicates| self.candidate(predicates))
                .collect();
            if candidates.is_empty() {
                break;
            }
            for candidate in &mut candidates {
                self.sample(candidate, config.batch_size.max(1))?;
            }

            let chosen = self.kl_lucb(&mut candidates, config.beam_size.max(1))?;

            let mut best: Option<usize> = None;
            for &index in &chosen {
                self.verify(&mut candidates[index])?;
                let candidate = &candidates[index];
                best_precision = best_precision.max(candidate.precision());

                let lower = lower_bound(
                    candidate.precision(),
                    beta / candidate.samples as f64,
                );
                let valid = candidate.precision() >= config.threshold
                    && lower > config.threshold - config.epsilon;
                let better = best.is_none_or(|b| candidate.coverage > candidates[b].coverage);
                if valid && better {
                    best = Some(index);
                }
            }
            tracing::trace!(size, chosen = chosen.len(), found = best.is_some(), "anchor beam level");

            if let Some(index) = best {
                return Ok(candidates.swap_remove(index));
            }
            beam = chosen
                .iter()
                .map(|&i| candidates[i].predicates.clone())
                .collect();
        }

        Err(ExplainabilityError::ThresholdNotMet {
            threshold: config.threshold,
            best_precision,
        })
    }

    fn candidate(&self, predicates: Vec<usize>) -> Candidate {
        let covered = self
            .coverage_rows
            .iter()
            .filter(|&&row| self.satisfies(&predicates, &self.explainer.reference.rows[row]))
            .count();
        let coverage = if self.coverage_rows.is_empty() {
            0.0
        } else {
            covered as f64 / self.coverage_rows.len() as f64
        };
        Candidate {
            predicates,
            samples: 0,
            positives: 0,
            coverage,
        }
    }

    /// Every rule one predicate longer than a rule in the beam.
    fn extend_beam(&self, beam: &[Vec<usize>]) -> Vec<Vec<usize>> {
        let mut extended: Vec<Vec<usize>> = Vec::new();
        for anchor in beam {
            for p in 0..self.predicates.len() {
                if anchor.contains(&p) {
                    continue;
                }
                let mut next = anchor.clone();
                next.push(p);
                next.sort_unstable();
                if !extended.contains(&next) {
                    extended.push(next);
                }
            }
        }
        extended
    }

    /// Pick the `top_n` most precise candidates with KL-LUCB.
    fn kl_lucb(
        &mut self,
        candidates: &mut [Candidate],
        top_n: usize,
    ) -> Result<Vec<usize>, ExplainabilityError> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        if candidates.len() <= top_n {
            order.sort_by(|a, b| candidates[*b].precision().total_cmp(&candidates[*a].precision()));
            return Ok(order);
        }

        let config = self.config;
        let mut round = 1usize;
        loop {
            order.sort_by(|a, b| candidates[*b].precision().total_cmp(&candidates[*a].precision()));
            let (top, rest) = order.split_at(top_n);
            let beta = compute_beta(candidates.len(), round, config.delta);

            let weakest_top = top
                .iter()
                .copied()
                .map(|i| {
                    let c = &candidates[i];
                    (i, lower_bound(c.precision(), beta / c.samples as f64))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            let strongest_rest = rest
                .iter()
                .copied()
                .map(|i| {
                    let c = &candidates[i];
                    (i, upper_bound(c.precision(), beta / c.samples as f64))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1));

            let (Some((lt, lb)), Some((ut, ub))) = (weakest_top, strongest_rest) else {
                return Ok(top.to_vec());
            };
            if ub - lb <= config.epsilon {
                return Ok(top.to_vec());
            }

            let exhausted = [lt, ut]
                .iter()
                .all(|&i| candidates[i].samples >= config.max_samples);
            if exhausted {
                return Ok(top.to_vec());
            }
            for index in [lt, ut] {
                if candidates[index].samples < config.max_samples {
                    self.sample(&mut candidates[index], config.batch_size.max(1))?;
                }
            }
            round += 1;
        }
    }

    /// Sample until the precision is confidently above or below the threshold.
    fn verify(&mut self, candidate: &mut Candidate) -> Result<(), ExplainabilityError> {
        let config = self.config;
        let beta = (1.0 / config.delta).ln();
        while candidate.samples < config.max_samples {
            let mean = candidate.precision();
            let level = beta / candidate.samples.max(1) as f64;
            let lower = lower_bound(mean, level);
            let upper = upper_bound(mean, level);
            let undecided = (mean >= config.threshold && lower < config.threshold - config.epsilon)
                || (mean < config.threshold && upper >= config.threshold + config.epsilon);
            if !undecided {
                break;
            }
            self.sample(candidate, config.batch_size.max(1))?;
        }
        Ok(())
    }

    /// Draw `n` perturbations satisfying the candidate and record agreement.
    fn sample(&mut self, candidate: &mut Candidate, n: usize) -> Result<(), ExplainabilityError> {
        if Instant::now() >= self.deadline {
            return Err(ExplainabilityError::Timeout {
                budget_ms: self.config.timeout_ms,
            });
        }

        let reference = self.explainer.reference;
        let constrained: Vec<(usize, Vec<f64>)> = self
            .constrained_features(&candidate.predicates)
            .into_iter()
            .map(|feature| {
                let eligible = reference
                    .column(feature)
                    .filter(|v| self.feature_holds(&candidate.predicates, feature, *v))
                    .collect();
                (feature, eligible)
            })
            .collect();

        let mut positives = 0;
        for _ in 0..n {
            let mut row = reference.rows[self.rng.usize(..reference.n_rows())].clone();
            for (feature, eligible) in &constrained {
                if self.feature_holds(&candidate.predicates, *feature, row[*feature]) {
                    continue;
                }
                row[*feature] = if eligible.is_empty() {
                    self.instance[*feature]
                } else {
                    eligible[self.rng.usize(..eligible.len())]
                };
            }
            if self.explainer.classifier.predict(&row) == self.target {
                positives += 1;
            }
        }

        candidate.samples += n;
        candidate.positives += positives;
        self.samples_drawn += n;
        Ok(())
    }

    fn constrained_features(&self, predicates: &[usize]) -> Vec<usize> {
        let mut features: Vec<usize> = predicates.iter().map(|&p| self.predicates[p].feature).collect();
        features.sort_unstable();
        features.dedup();
        features
    }

    fn feature_holds(&self, predicates: &[usize], feature: usize, value: f64) -> bool {
        predicates
            .iter()
            .map(|&p| &self.predicates[p])
            .filter(|p| p.feature == feature)
            .all(|p| p.holds(value))
    }

    fn satisfies(&self, predicates: &[usize], row: &[f64]) -> bool {
        predicates
            .iter()
            .map(|&p| &self.predicates[p])
            .all(|p| p.holds(row[p.feature]))
    }

    fn draw_coverage_rows(&mut self) -> Vec<usize> {
        let n_rows = self.explainer.reference.n_rows();
        if n_rows <= self.config.coverage_samples {
            return (0..n_rows).collect();
        }
        (0..self.config.coverage_samples)
            .map(|_| self.rng.usize(..n_rows))
            .collect()
    }
}

fn kl_bernoulli(p: f64, q: f64) -> f64 {
    let p = p.clamp(1e-7, 1.0 - 1e-7);
    let q = q.clamp(1e-7, 1.0 - 1e-7);
    p * (p / q).ln() + (1.0 - p) * ((1.0 - p) / (1.0 - q)).ln()
}

/// Largest `q >= p` with `kl(p, q) <= level`, by bisection.
fn upper_bound(p: f64, level: f64) -> f64 {
    let mut low = p;
    let mut high = (p + (level / 2.0).sqrt()).min(1.0);
    for _ in 0..17 {
        let mid = (low + high) / 2.0;
        if kl_bernoulli(p, mid) > level {
            high = mid;
        } else {
            low = mid;
        }
    }
    high
}

/// Smallest `q <= p` with `kl(p, q) <= level`, by bisection.
fn lower_bound(p: f64, level: f64) -> f64 {
    let mut high = p;
    let mut low = (p - (level / 2.0).sqrt()).max(0.0);
    for _ in 0..17 {
        let mid = (low + high) / 2.0;
        if kl_bernoulli(p, mid) > level {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Exploration rate of KL-LUCB (Kaufmann and Kalyanakrishnan, 2013).
fn compute_beta(n_arms: usize, round: usize, delta: f64) -> f64 {
    let alpha = 1.1;
    let k = 405.5;
    let temp = (k * n_arms as f64 * (round as f64).powf(alpha) / delta).ln();
    temp + temp.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassifierStage, DecisionTree, TreeEnsemble, TreeNode, fixtures};

    fn leaf(class: usize, cover: f64) -> TreeNode {
        let mut value = vec![0.0, 0.0];
        value[class] = 1.0;
        TreeNode::Leaf { value, cover }
    }

    fn forest(nodes: Vec<TreeNode>) -> ClassifierStage {
        let mut forest = TreeEnsemble {
            n_features: 2,
            n_classes: 2,
            trees: vec![DecisionTree { nodes }],
        };
        forest.prepare().unwrap();
        ClassifierStage::RandomForest(forest)
    }

    /// 200 rows spread evenly over [0, 1) on both columns.
    fn reference() -> EncodedFeatures {
        EncodedFeatures {
            columns: vec!["x".into(), "noise".into()],
            rows: (0..200)
                .map(|i| vec![i as f64 / 200.0, ((i * 37) % 200) as f64 / 200.0])
                .collect(),
        }
    }

    fn labels() -> Vec<String> {
        vec!["left".into(), "right".into()]
    }

    #[test]
    fn test_separable_model_yields_rule() {
        let model = forest(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.5,
                left: 1,
                right: 2,
                cover: 200.0,
            },
            leaf(0, 100.0),
            leaf(1, 100.0),
        ]);
        let labels = labels();
        let reference = reference();
        let explainer = AnchorExplainer::new(&model, &labels, &reference, IndexMap::new()).unwrap();

        let rule = explainer.explain(&[0.1, 0.5], &AnchorConfig::default()).unwrap();

        assert_eq!(rule.predicted_class, "left");
        assert!(rule.precision >= 0.95);
        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.conditions[0].feature, "x");
        assert_eq!(rule.conditions[0].operator, Operator::Leq);
        assert!(rule.coverage > 0.2 && rule.coverage < 0.3);
        assert!(rule.describe().starts_with("IF x <= 0.25"));
    }

    #[test]
    fn test_unlabelled_class_is_model_error() {
        let model = forest(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.5,
                left: 1,
                right: 2,
                cover: 200.0,
            },
            leaf(0, 100.0),
            leaf(1, 100.0),
        ]);
        let labels = vec!["left".to_string()];
        let reference = reference();
        let explainer = AnchorExplainer::new(&model, &labels, &reference, IndexMap::new()).unwrap();

        let err = explainer.explain(&[0.9, 0.5], &AnchorConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ExplainabilityError::Model(ModelError::InvalidProbabilities(_))
        ));
    }

    #[test]
    fn test_alternating_model_fails_threshold() {
        // Class flips every 0.05 along x, so no quartile bin is pure
        let mut nodes = Vec::new();
        for k in 0..19 {
            let index = nodes.len();
            nodes.push(TreeNode::Split {
                feature: 0,
                threshold: (k + 1) as f64 * 0.05,
                left: index + 1,
                right: index + 2,
                cover: (20 - k) as f64 * 10.0,
            });
            nodes.push(leaf(k % 2, 10.0));
        }
        nodes.push(leaf(1, 10.0));
        let model = forest(nodes);
        let labels = labels();
        let reference = reference();
        let explainer = AnchorExplainer::new(&model, &labels, &reference, IndexMap::new()).unwrap();

        let err = explainer
            .explain(&[0.02, 0.5], &AnchorConfig::default())
            .unwrap_err();
        match err {
            ExplainabilityError::ThresholdNotMet {
                threshold,
                best_precision,
            } => {
                assert_eq!(threshold, 0.95);
                assert!(best_precision < 0.95);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_zero_budget_times_out() {
        let model = forest(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.5,
                left: 1,
                right: 2,
                cover: 200.0,
            },
            leaf(0, 100.0),
            leaf(1, 100.0),
        ]);
        let labels = labels();
        let reference = reference();
        let explainer = AnchorExplainer::new(&model, &labels, &reference, IndexMap::new()).unwrap();
        let config = AnchorConfig {
            timeout_ms: 0,
            ..AnchorConfig::default()
        };

        let err = explainer.explain(&[0.1, 0.5], &config).unwrap_err();
        assert_eq!(err, ExplainabilityError::Timeout { budget_ms: 0 });
    }

    #[test]
    fn test_categorical_condition_uses_names() {
        let pipeline = fixtures::penguin_pipeline();
        let reference = EncodedFeatures {
            columns: pipeline.encoder.encoded_columns(),
            rows: vec![
                vec![0.0, 1.0, 47.0, 15.0, 220.0, 5400.0],
                vec![2.0, 0.0, 38.0, 18.5, 185.0, 3500.0],
                vec![1.0, 1.0, 50.0, 19.0, 196.0, 3800.0],
            ],
        };
        let mut names = IndexMap::new();
        names.insert(0, pipeline.encoder.categorical[0].categories.clone());
        names.insert(1, pipeline.encoder.categorical[1].categories.clone());
        let explainer =
            AnchorExplainer::new(&pipeline.classifier, &pipeline.class_labels, &reference, names)
                .unwrap();

        let condition = explainer.condition(&Predicate {
            feature: 0,
            test: Test::Eq(2.0),
        });
        assert_eq!(condition.to_string(), "island = Torgersen");

        let condition = explainer.condition(&Predicate {
            feature: 4,
            test: Test::Gt(197.0),
        });
        assert_eq!(condition.to_string(), "flipper_length_mm > 197.00");
    }

    #[test]
    fn test_empty_reference_rejected() {
        let pipeline = fixtures::penguin_pipeline();
        let reference = EncodedFeatures {
            columns: pipeline.encoder.encoded_columns(),
            rows: Vec::new(),
        };
        let result = AnchorExplainer::new(
            &pipeline.classifier,
            &pipeline.class_labels,
            &reference,
            IndexMap::new(),
        );
        assert!(matches!(result, Err(ExplainabilityError::Reference(_))));
    }

    #[test]
    fn test_bounds_bracket_the_mean() {
        let level = (1.0f64 / 0.1).ln() / 100.0;
        let low = lower_bound(0.9, level);
        let high = upper_bound(0.9, level);
        assert!(low < 0.9 && 0.9 < high);
        assert!(lower_bound(1.0, level) > 0.95);
        assert!(compute_beta(4, 2, 0.1) > compute_beta(4, 1, 0.1));
    }
}
