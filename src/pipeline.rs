//! Pipeline orchestration
//!
//! This module provides the public API for the SpO2 stress model.
//! Training runs the full chain from per-subject numerics files to persisted
//! artifacts; scoring reloads those artifacts and applies them to new files.

use crate::adapters::NumericsAdapter;
use crate::calibration::{CalibrationParams, ScoreCalibrator};
use crate::config::{ExtractorConfig, TrainerConfig, MODEL_FILE, PARAMS_FILE, SPO2_COLUMN};
use crate::encoder::{self, ArtifactEncoder};
use crate::error::StressError;
use crate::features::FeatureExtractor;
use crate::histogram::ScoreHistogram;
use crate::metrics::ClassificationReport;
use crate::model::LogisticModel;
use crate::split::stratified_split;
use crate::types::{Dataset, FileOutcome, LabeledWindow, ScoreRecord, ScoredWindow, SkipReason};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Outcome per input file, in processing order
    pub files: Vec<FileOutcome>,
    pub windows: usize,
    /// Window counts indexed by label
    pub class_counts: [usize; 2],
    pub train_size: usize,
    pub test_size: usize,
    pub model: LogisticModel,
    /// Test partition metrics
    pub report: ClassificationReport,
    pub params: CalibrationParams,
    pub histogram: ScoreHistogram,
    /// Paths written by the run
    pub artifacts: Vec<PathBuf>,
    /// Calibrated test partition rows
    #[serde(skip)]
    pub records: Vec<ScoreRecord>,
}

/// Train, calibrate and persist the SpO2 stress model.
///
/// # Example
/// ```ignore
/// let report = train_spo2_model(&TrainerConfig::default())?;
/// println!("{}", report.report);
/// ```
pub fn train_spo2_model(config: &TrainerConfig) -> Result<TrainingReport, StressError> {
    Spo2Trainer::new(config.clone())?.run()
}

/// Numerics files in `dir` whose names end with `suffix`, sorted by name
pub fn list_inputs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, StressError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read and window one numerics file.
///
/// Failures never propagate: they become a skipped outcome so one bad
/// subject cannot abort a run.
pub fn ingest_file(
    path: &Path,
    column: &str,
    extractor: &ExtractorConfig,
) -> (FileOutcome, Vec<LabeledWindow>) {
    let skipped = |reason: SkipReason| {
        tracing::warn!(path = %path.display(), %reason, "skipping file");
        (
            FileOutcome::Skipped {
                path: path.to_path_buf(),
                reason,
            },
            Vec::new(),
        )
    };

    let series = match NumericsAdapter::read_path(path, column) {
        Ok(series) => series,
        Err(StressError::MissingColumn { column, .. }) => {
            return skipped(SkipReason::MissingColumn { column })
        }
        Err(e) => {
            return skipped(SkipReason::ReadError {
                message: e.to_string(),
            })
        }
    };

    let readings = NumericsAdapter::compact(&series);
    if readings.len() < extractor.window {
        return skipped(SkipReason::TooFewSamples {
            count: readings.len(),
            required: extractor.window,
        });
    }

    let windows = FeatureExtractor::extract_complete(&readings, extractor);
    if windows.is_empty() {
        return skipped(SkipReason::ZeroWindows);
    }

    tracing::info!(
        path = %path.display(),
        samples = readings.len(),
        windows = windows.len(),
        "loaded file"
    );
    (
        FileOutcome::Loaded {
            path: path.to_path_buf(),
            samples: readings.len(),
            windows: windows.len(),
        },
        windows,
    )
}

/// Accumulate windows across every input file
pub fn collect_dataset(config: &TrainerConfig) -> Result<(Dataset, Vec<FileOutcome>), StressError> {
    let paths = list_inputs(&config.input_dir, &config.file_suffix)?;
    tracing::info!(dir = %config.input_dir.display(), files = paths.len(), "scanning inputs");

    let mut dataset = Dataset::new();
    let mut outcomes = Vec::with_capacity(paths.len());
    for path in &paths {
        let (outcome, windows) = ingest_file(path, &config.column, &config.extractor);
        dataset.extend_windows(&windows);
        outcomes.push(outcome);
    }

    if dataset.is_empty() {
        return Err(StressError::NoValidData);
    }
    Ok((dataset, outcomes))
}

/// Trainer for the SpO2 stress model
pub struct Spo2Trainer {
    config: TrainerConfig,
    encoder: ArtifactEncoder,
}

impl Spo2Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self, StressError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ArtifactEncoder::new(),
        })
    }

    /// Use a specific encoder, e.g. with a fixed instance ID
    pub fn with_encoder(mut self, encoder: ArtifactEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run every stage and write the artifacts.
    ///
    /// Stages:
    /// 1. NumericsAdapter + FeatureExtractor - windows per file
    /// 2. stratified_split - seeded train/test partitions
    /// 3. LogisticModel - balanced, L2-regularized fit
    /// 4. ScoreCalibrator - z-score, regression and tanh squashing
    /// 5. ArtifactEncoder - model, parameters and score tables
    pub fn run(&self) -> Result<TrainingReport, StressError> {
        let config = &self.config;

        // Stage 1: windows across all subjects
        let (dataset, files) = collect_dataset(config)?;
        let class_counts = dataset.class_counts();
        tracing::info!(
            windows = dataset.len(),
            non_stress = class_counts[0],
            stress = class_counts[1],
            "dataset assembled"
        );

        // Stage 2: split
        let split = stratified_split(&dataset.labels, config.test_fraction, config.seed)?;
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);
        tracing::info!(train = train.len(), test = test.len(), "stratified split");

        // Stage 3: classifier
        let model = LogisticModel::fit(&train.features, &train.labels, &config.model)?;
        let probs_train = model.predict_proba_batch(&train.features);
        let probs_test = model.predict_proba_batch(&test.features);
        let predicted = model.predict_batch(&test.features);
        let report = ClassificationReport::new(&test.labels, &predicted);
        tracing::info!(
            accuracy = report.accuracy,
            iterations = model.iterations,
            "classifier fitted"
        );

        // Stage 4: calibration
        let calibration = ScoreCalibrator::new(config.center).calibrate(
            &train.features,
            &test.features,
            &train.labels,
            &probs_train,
            &probs_test,
        )?;

        let records: Vec<ScoreRecord> = (0..test.len())
            .map(|i| ScoreRecord {
                z_score: calibration.z_test[i],
                logit: calibration.logit_test[i],
                tanh_score: calibration.scores[i],
                true_label: test.labels[i],
                predicted: predicted[i],
            })
            .collect();
        let histogram =
            ScoreHistogram::new(&calibration.scores, &test.labels, config.histogram_bins);

        // Stage 5: artifacts
        let artifacts = vec![
            config.model_path(),
            config.params_path(),
            config.scores_path(),
            config.histogram_path(),
        ];
        self.encoder.write_model(&artifacts[0], &model, &config.extractor)?;
        self.encoder.write_params(&artifacts[1], &calibration.params)?;
        encoder::write_scores(&artifacts[2], &records)?;
        encoder::write_histogram(&artifacts[3], &histogram)?;
        for path in &artifacts {
            tracing::info!(path = %path.display(), "saved");
        }

        Ok(TrainingReport {
            files,
            windows: dataset.len(),
            class_counts,
            train_size: train.len(),
            test_size: test.len(),
            model,
            report,
            params: calibration.params,
            histogram,
            artifacts,
            records,
        })
    }
}

/// Applies a persisted model and calibration to new numerics files
#[derive(Debug, Clone)]
pub struct Spo2Scorer {
    model: LogisticModel,
    params: CalibrationParams,
    extractor: ExtractorConfig,
    column: String,
}

impl Spo2Scorer {
    pub fn new(
        model: LogisticModel,
        params: CalibrationParams,
        extractor: ExtractorConfig,
    ) -> Self {
        Self {
            model,
            params,
            extractor,
            column: SPO2_COLUMN.to_string(),
        }
    }

    /// Load the model and parameter artifacts written by a training run.
    ///
    /// Windowing follows the settings stored with the model.
    pub fn load(models_dir: &Path) -> Result<Self, StressError> {
        let model = encoder::read_model(&models_dir.join(MODEL_FILE))?;
        let params = encoder::read_params(&models_dir.join(PARAMS_FILE))?;
        tracing::info!(
            dir = %models_dir.display(),
            trained_by = %model.producer.instance_id,
            "loaded model artifacts"
        );
        Ok(Self::new(model.model, params.params, model.extractor))
    }

    /// Read readings from a different column
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }

    /// Score already-extracted windows
    pub fn score_windows(&self, file: &str, windows: &[LabeledWindow]) -> Vec<ScoredWindow> {
        windows
            .iter()
            .map(|window| {
                let features = window.features.to_array();
                let (z_score, logit, tanh_score) = self.params.score_features(&features);
                ScoredWindow {
                    file: file.to_string(),
                    window: window.start,
                    z_score,
                    logit,
                    tanh_score,
                    probability: self.model.predict_proba(&features),
                    predicted: self.model.predict(&features),
                }
            })
            .collect()
    }

    /// Score every file, skipping unusable ones the same way training does
    pub fn score_files(&self, paths: &[PathBuf]) -> (Vec<ScoredWindow>, Vec<FileOutcome>) {
        let mut scored = Vec::new();
        let mut outcomes = Vec::with_capacity(paths.len());

        for path in paths {
            let (outcome, windows) = ingest_file(path, &self.column, &self.extractor);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            scored.extend(self.score_windows(&name, &windows));
            outcomes.push(outcome);
        }

        (scored, outcomes)
    }
}
