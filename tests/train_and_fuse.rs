use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use stress_score::encoder::{self, FUSED_SCORE_HEADER, INTERPRETATION_HEADER};
use stress_score::{
    Alignment, ExtractorConfig, FileOutcome, FusionConfig, ScoreFuser, SkipReason, Spo2Scorer,
    StressError, StressLevel, TrainerConfig,
};

fn write_numerics(dir: &Path, name: &str, header: &str, values: &[Option<f64>]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "{header}").unwrap();
    for (t, value) in values.iter().enumerate() {
        match value {
            Some(v) => writeln!(file, "{t},72,{v}").unwrap(),
            None => writeln!(file, "{t},72,").unwrap(),
        }
    }
    path
}

/// Blocks of normal saturation interleaved with desaturation episodes
fn subject(offset: usize) -> Vec<Option<f64>> {
    (0..240)
        .map(|t| {
            if t % 97 == 13 {
                return None;
            }
            let jitter = ((t * 11 + offset * 5) % 7) as f64 * 0.2;
            Some(if (t / 30 + offset) % 3 == 0 { 90.0 + jitter } else { 96.5 + jitter })
        })
        .collect()
}

fn trainer_config(root: &Path) -> TrainerConfig {
    TrainerConfig {
        input_dir: root.join("numerics"),
        extractor: ExtractorConfig::new(12, 6, 94.0),
        models_dir: root.join("models"),
        exports_dir: root.join("exports"),
        ..Default::default()
    }
}

fn seed_inputs(root: &Path) {
    let input = root.join("numerics");
    fs::create_dir_all(&input).unwrap();
    for i in 0..4 {
        write_numerics(
            &input,
            &format!("bidmc_{:02}_Numerics.csv", i + 1),
            "Time [s], HR, SpO2",
            &subject(i),
        );
    }
    write_numerics(&input, "bidmc_05_Numerics.csv", "Time [s], HR, RESP", &subject(0));
    write_numerics(&input, "bidmc_06_Numerics.csv", "Time [s], HR, SpO2", &subject(1)[..5]);
    // Not a numerics file; ignored
    fs::write(input.join("bidmc_01_Signals.csv"), "Time [s], PLETH\n0,0.5\n").unwrap();
}

#[test]
fn test_training_skips_bad_files_and_writes_tables() {
    let root = tempfile::tempdir().unwrap();
    seed_inputs(root.path());
    let config = trainer_config(root.path());

    let report = stress_score::train_spo2_model(&config).unwrap();

    assert_eq!(report.files.len(), 6);
    assert_eq!(report.files.iter().filter(|f| f.is_loaded()).count(), 4);
    match &report.files[4] {
        FileOutcome::Skipped { reason, .. } => assert_eq!(
            reason,
            &SkipReason::MissingColumn {
                column: "SpO2".to_string()
            }
        ),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        &report.files[5],
        FileOutcome::Skipped {
            reason: SkipReason::TooFewSamples { count: 5, required: 12 },
            ..
        }
    ));

    // Scores table holds one row per test window with the expected headers
    let mut reader = csv::Reader::from_path(config.scores_path()).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["z-score", "logit", "tanh_score", "true_label", "predicted"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), report.test_size);

    // Persisted parameters reproduce every exported score
    let params = encoder::read_params(&config.params_path()).unwrap().params;
    assert_eq!(params, report.params);
    for row in &rows {
        let z: f64 = row[0].parse().unwrap();
        let logit: f64 = row[1].parse().unwrap();
        let score: f64 = row[2].parse().unwrap();
        assert!((params.logit(z) - logit).abs() < 1e-9);
        assert!((params.score(logit) - score).abs() < 1e-9);
        assert!(score > -1.0 && score < 1.0);
    }

    let histogram = fs::read_to_string(config.histogram_path()).unwrap();
    assert_eq!(histogram.lines().count(), 1 + config.histogram_bins);
}

#[test]
fn test_same_seed_same_split() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    seed_inputs(first.path());
    seed_inputs(second.path());

    let a = stress_score::train_spo2_model(&trainer_config(first.path())).unwrap();
    let b = stress_score::train_spo2_model(&trainer_config(second.path())).unwrap();

    assert_eq!(a.records, b.records);
    assert_eq!(a.params, b.params);
}

#[test]
fn test_empty_input_directory_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("numerics")).unwrap();

    let result = stress_score::train_spo2_model(&trainer_config(root.path()));
    assert!(matches!(result, Err(StressError::NoValidData)));
}

#[test]
fn test_scorer_reloads_artifacts() {
    let root = tempfile::tempdir().unwrap();
    seed_inputs(root.path());
    let config = trainer_config(root.path());
    let report = stress_score::train_spo2_model(&config).unwrap();

    let scorer = Spo2Scorer::load(&config.models_dir).unwrap();
    let fresh = write_numerics(root.path(), "new_Numerics.csv", "Time [s], HR, SpO2", &subject(7));
    let (scored, outcomes) = scorer.score_files(&[fresh]);

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_loaded());
    assert!(!scored.is_empty());
    for window in &scored {
        assert_eq!(window.file, "new_Numerics.csv");
        assert!((report.params.score(window.logit) - window.tanh_score).abs() < 1e-12);
    }

    let output = root.path().join("exports").join("window_scores.csv");
    encoder::write_scored_windows(&output, &scored).unwrap();
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("file,window,z-score,logit,tanh_score,probability,predicted\n"));
}

fn write_scores(dir: &Path, name: &str, rows: &[(&str, f64)]) -> PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "window,logit,tanh_score").unwrap();
    for (key, score) in rows {
        writeln!(file, "{key},0.0,{score}").unwrap();
    }
    path
}

#[test]
fn test_fuse_strict_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..5)
        .map(|i| {
            write_scores(
                root.path(),
                &format!("modality_{i}.csv"),
                &[("w0", 0.5), ("w1", -0.5), ("w2", 0.0)],
            )
        })
        .collect();
    let output = root.path().join("out").join("fused.csv");

    let fuser = ScoreFuser::new(FusionConfig {
        modality_files: files,
        output: output.clone(),
        ..Default::default()
    })
    .unwrap();
    let fused = fuser.run().unwrap();

    let levels: Vec<StressLevel> = fused.iter().map(|f| f.interpretation).collect();
    assert_eq!(
        levels,
        vec![StressLevel::High, StressLevel::NonStress, StressLevel::Moderate]
    );

    let content = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], format!("{FUSED_SCORE_HEADER},{INTERPRETATION_HEADER}"));
    assert_eq!(lines[1], "0.5,High Stress");
    assert_eq!(lines[2], "-0.5,Non-Stress");
    assert_eq!(lines[3], "0,Moderate Stress");
}

#[test]
fn test_fuse_alignment_modes_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let first = write_scores(root.path(), "a.csv", &[("w0", 0.8), ("w1", -0.8)]);
    let second = write_scores(root.path(), "b.csv", &[("w1", -0.4), ("w0", 0.4), ("w2", 0.9)]);
    let output = root.path().join("fused.csv");

    let config = |alignment: Alignment| FusionConfig {
        modality_files: vec![first.clone(), second.clone()],
        alignment,
        output: output.clone(),
        ..Default::default()
    };

    let strict = ScoreFuser::new(config(Alignment::Strict)).unwrap().run();
    assert!(matches!(strict, Err(StressError::MisalignedScores(_))));

    // Positional truncation pairs w0 with w1
    let truncated = ScoreFuser::new(config(Alignment::TruncateToFirst))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(truncated.len(), 2);
    assert!((truncated[0].score - 0.2).abs() < 1e-12);

    let keyed = ScoreFuser::new(config(Alignment::ByKey("window".to_string())))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(keyed.len(), 2);
    assert!((keyed[0].score - 0.6).abs() < 1e-12);
    assert!((keyed[1].score + 0.6).abs() < 1e-12);

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("window,Fused Stress Score,Interpretation\n"));
    assert!(content.contains("w1,"));
}

#[test]
fn test_fuse_missing_file_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let fuser = ScoreFuser::new(FusionConfig {
        modality_files: vec![root.path().join("absent.csv")],
        output: root.path().join("fused.csv"),
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(fuser.run(), Err(StressError::Io(_))));
}
