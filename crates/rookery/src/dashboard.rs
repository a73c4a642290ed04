//! The dashboard: every expensive artifact loaded once, then cheap per-request
//! cycles of collect, predict, explain and render.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RookeryConfig;
use crate::eda::DatasetOverview;
use crate::error::{DataLoadError, ModelError, Result, RookeryError, ValidationError};
use crate::explain::html::{
    ATTRIBUTION_HEIGHT, RULE_HEIGHT, attribution_fragment, failure_fragment, rule_fragment,
};
use crate::explain::{
    BackendResult, ExplainRequest, ExplanationAdapter, ExplanationReport, encode_reference,
};
use crate::form::{FormSpec, FormValues, collect_input};
use crate::input::{DataTable, Parser, SourceMetadata};
use crate::model::{Classifier, EncodedFeatures, TrainedPipeline};
use crate::predict::{self, Prediction};
use crate::profile::DatasetProfile;
use crate::record::FeatureRecord;
use crate::render::{PresentationSink, TableView};

/// Result of one request cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    Explained {
        record: FeatureRecord,
        prediction: Prediction,
        report: ExplanationReport,
    },
    /// The submitted values were rejected.
    Invalid { error: String },
    /// The model could not process the record.
    ModelFailed { error: String },
}

/// Loaded dataset, profile, pipeline and reference sample.
pub struct Dashboard {
    config: RookeryConfig,
    table: DataTable,
    source: Option<SourceMetadata>,
    profile: DatasetProfile,
    pipeline: Arc<TrainedPipeline>,
    reference: EncodedFeatures,
    form: FormSpec,
    overview: std::result::Result<DatasetOverview, DataLoadError>,
}

impl Dashboard {
    /// Load the dataset and pipeline artifact from disk.
    pub fn load(
        config: RookeryConfig,
        data_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let parser = Parser::with_config(config.dataset.parser.clone());
        let (table, source) = parser.parse_file(data_path)?;
        let pipeline = TrainedPipeline::load(model_path)?;
        Self::from_parts(config, table, Some(source), pipeline)
    }

    /// Assemble a dashboard from already-loaded parts.
    pub fn from_parts(
        config: RookeryConfig,
        table: DataTable,
        source: Option<SourceMetadata>,
        pipeline: TrainedPipeline,
    ) -> Result<Self> {
        config.validate()?;
        let profile = DatasetProfile::build(&table, &config.dataset)?;
        pipeline.check_against(&profile)?;

        let (records, skipped) = profile.reference_records(&table)?;
        if records.is_empty() {
            return Err(DataLoadError::EmptyData(
                "no complete rows for the reference sample".to_string(),
            )
            .into());
        }
        let reference = encode_reference(
            &pipeline,
            &records,
            config.explain.reference_sample,
            config.explain.seed,
        )?;

        let form = FormSpec::from_profile(&profile, &config.form);
        let overview = DatasetOverview::build(&table, &profile, &config.overview);
        if let Err(e) = &overview {
            tracing::warn!(error = %e, "dataset overview unavailable");
        }

        tracing::info!(
            rows = table.row_count(),
            reference_rows = reference.n_rows(),
            skipped,
            classifier = pipeline.classifier.name(),
            "dashboard ready"
        );

        Ok(Self {
            config,
            table,
            source,
            profile,
            pipeline: Arc::new(pipeline),
            reference,
            form,
            overview,
        })
    }

    pub fn config(&self) -> &RookeryConfig {
        &self.config
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn source(&self) -> Option<&SourceMetadata> {
        self.source.as_ref()
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    pub fn pipeline(&self) -> &Arc<TrainedPipeline> {
        &self.pipeline
    }

    pub fn reference(&self) -> &EncodedFeatures {
        &self.reference
    }

    pub fn form_spec(&self) -> &FormSpec {
        &self.form
    }

    pub fn overview(&self) -> std::result::Result<&DatasetOverview, &DataLoadError> {
        self.overview.as_ref()
    }

    /// Default explain parameters from the configuration.
    pub fn default_request(&self) -> ExplainRequest {
        ExplainRequest {
            threshold: self.config.explain.anchor.threshold,
        }
    }

    /// Validate submitted values into a record.
    pub fn collect(&self, values: &FormValues) -> std::result::Result<FeatureRecord, ValidationError> {
        collect_input(&self.profile, values, self.config.form.bounds)
    }

    pub fn predict(&self, record: &FeatureRecord) -> std::result::Result<Prediction, ModelError> {
        predict::predict(&self.pipeline, &self.profile, record)
    }

    pub fn explain(
        &self,
        record: &FeatureRecord,
        request: &ExplainRequest,
    ) -> std::result::Result<ExplanationReport, ModelError> {
        ExplanationAdapter::new(
            &self.pipeline,
            &self.profile,
            &self.reference,
            &self.config.explain,
        )
        .explain(record, request)
    }

    /// Run collect, predict and explain, capturing per-request errors.
    pub fn handle(&self, values: &FormValues, request: &ExplainRequest) -> RequestOutcome {
        match self.try_handle(values, request) {
            Ok(outcome) => outcome,
            Err(RookeryError::Validation(e)) => RequestOutcome::Invalid {
                error: e.to_string(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                RequestOutcome::ModelFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn try_handle(&self, values: &FormValues, request: &ExplainRequest) -> Result<RequestOutcome> {
        let record = self.collect(values)?;
        let prediction = self.predict(&record)?;
        let report = self.explain(&record, request)?;
        Ok(RequestOutcome::Explained {
            record,
            prediction,
            report,
        })
    }

    /// Drive one full cycle against a sink: form, prediction, explanations.
    pub fn render(&self, sink: &mut dyn PresentationSink, request: &ExplainRequest) -> RequestOutcome {
        let values = sink.render_form(&self.form);
        let outcome = self.handle(&values, request);

        match &outcome {
            RequestOutcome::Explained {
                prediction, report, ..
            } => {
                sink.render_heading("Prediction");
                let confidence = prediction
                    .confidence()
                    .map(|p| format!(" (probability {:.3})", p))
                    .unwrap_or_default();
                sink.render_text(&format!(
                    "Predicted {}: {}{}",
                    self.profile.label_column, prediction.class_label, confidence
                ));
                sink.render_table(&TableView::probabilities(
                    prediction,
                    &self.profile.label_column,
                ));

                sink.render_heading("Feature attribution");
                match &report.attribution {
                    BackendResult::Ready { explanation } => {
                        sink.render_rich_html(&attribution_fragment(explanation), ATTRIBUTION_HEIGHT)
                    }
                    BackendResult::Failed { error } => sink.render_rich_html(
                        &failure_fragment("Feature attribution", error),
                        ATTRIBUTION_HEIGHT,
                    ),
                }

                sink.render_heading("Rule explanation");
                match &report.rule {
                    BackendResult::Ready { explanation } => {
                        sink.render_rich_html(&rule_fragment(explanation), RULE_HEIGHT)
                    }
                    BackendResult::Failed { error } => sink.render_rich_html(
                        &failure_fragment("Rule explanation", error),
                        RULE_HEIGHT,
                    ),
                }
            }
            RequestOutcome::Invalid { error } | RequestOutcome::ModelFailed { error } => {
                sink.render_error(error)
            }
        }
        outcome
    }
}
