//! End-to-end runs over CSV files laid out the way the study data directory is.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

use stress_features::physio::{PrecomputedEcg, PrecomputedEda, TimeDomainHrv};
use stress_features::{
    process_recordings, BaselineCatalog, BaselineStatistic, BaselineTable, ComputeError, Config,
    DataPaths, DecompositionInput, FeatureDictionary, ParticipantId, PhysioProcessor, Recording,
    RecordingProcessor, RecordingTable, Reduction, VideoProcessor,
};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn write_baselines(paths: &DataPaths, pp: &str) {
    for (statistic, value) in [
        (BaselineStatistic::MeanSclBaseline, 1.5),
        (BaselineStatistic::MinSclBaseline, 1.0),
        (BaselineStatistic::MeanSclAll, 1.0),
        (BaselineStatistic::StdSclAll, 0.5),
        (BaselineStatistic::MaxSclAll, 3.0),
        (BaselineStatistic::MeanNnBaseline, 450.0),
        (BaselineStatistic::RmssdBaseline, 10.0),
        (BaselineStatistic::SdnnBaseline, 5.0),
    ] {
        write(
            &statistic.path(paths),
            &format!("pp,{}\n{},{}\n", statistic.value_column(), pp, value),
        );
    }
}

/// 4 Hz, 8 samples, EDA gap at row 2
const PHYSIO_CSV: &str = "\
t_from_start,raw_EDA,raw_ECG,pp
0.0,2.1,0.1,101
0.25,2.2,0.2,101
0.5,,0.3,101
0.75,2.3,0.1,101
1.0,2.2,0.2,101
1.25,2.1,0.3,101
1.5,2.0,0.1,101
1.75,2.1,0.2,101
";

fn eda_export() -> String {
    let mut csv = String::from("EDA_Tonic,SCR_Peaks\n");
    for i in 0..7 {
        csv.push_str(&format!("2.0,{}\n", if i == 3 { 1 } else { 0 }));
    }
    csv
}

fn ecg_export() -> String {
    let mut csv = String::from("ECG_Clean,ECG_R_Peaks\n");
    for i in 0..8 {
        csv.push_str(&format!("0.0,{}\n", if i % 2 == 0 { 1 } else { 0 }));
    }
    csv
}

#[test]
fn physio_targets_from_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::from_data_dir(dir.path());
    // ids persisted as floats still match integer participant ids
    write_baselines(&paths, "101.0");

    let recording_path = dir.path().join("pp101_task.csv");
    write(&recording_path, PHYSIO_CSV);
    let eda_path = dir.path().join("pp101_task_eda.csv");
    write(&eda_path, &eda_export());
    let ecg_path = dir.path().join("pp101_task_ecg.csv");
    write(&ecg_path, &ecg_export());

    let catalog = BaselineCatalog::load(&paths).unwrap();
    let eda = PrecomputedEda::from_table(&RecordingTable::from_csv_path(&eda_path).unwrap()).unwrap();
    let ecg = PrecomputedEcg::from_table(&RecordingTable::from_csv_path(&ecg_path).unwrap()).unwrap();
    let processor = PhysioProcessor::new(Config::default().physio, &catalog)
        .with_eda(&eda)
        .with_ecg(&ecg, &TimeDomainHrv);

    let recording = Recording::from_csv_path(&recording_path).unwrap();
    assert_eq!(recording.name, "pp101_task");

    let record = processor.process(&recording).unwrap();
    let features = &record.features;
    assert_eq!(features.participant, Some(ParticipantId::new("101")));
    assert_eq!(features.get("mean_SCL"), Some(2.0));
    assert_eq!(features.get("corrected_mean_SCL"), Some(0.5));
    assert_eq!(features.get("range_corrected_mean_SCL"), Some(0.5));
    assert_eq!(features.get("standardised_mean_scl"), Some(2.0));
    // one peak over 1.75 s
    let frequency = features.get("frequency_NS_SCR").unwrap();
    assert!((frequency - 60.0 / 1.75).abs() < 1e-9);

    assert_eq!(features.get("HRV_MeanNN"), Some(500.0));
    assert_eq!(features.get("HRV_MeanNN_corrected"), Some(50.0));
    assert_eq!(features.get("HRV_RMSSD_corrected"), Some(-10.0));
    assert_eq!(features.get("HRV_SDNN_corrected"), Some(-5.0));
}

#[test]
fn raw_column_policy_rejects_mismatched_export() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::from_data_dir(dir.path());
    write_baselines(&paths, "101");

    let table = RecordingTable::from_csv_reader(PHYSIO_CSV.as_bytes()).unwrap();
    let eda = PrecomputedEda::from_table(
        &RecordingTable::from_csv_reader(eda_export().as_bytes()).unwrap(),
    )
    .unwrap();
    let catalog = BaselineCatalog::load(&paths).unwrap();

    let mut config = Config::default().physio;
    config.eda_input = DecompositionInput::RawColumn;
    let processor = PhysioProcessor::new(config, &catalog).with_eda(&eda);

    // the export covers the 7 finite samples, the raw column has 8
    let result = processor.targets(&table);
    assert!(matches!(result, Err(ComputeError::DecompositionFailure(_))));
}

#[test]
fn unknown_participant_aborts_targets() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::from_data_dir(dir.path());
    write_baselines(&paths, "202");

    let table = RecordingTable::from_csv_reader(PHYSIO_CSV.as_bytes()).unwrap();
    let eda = PrecomputedEda::from_table(
        &RecordingTable::from_csv_reader(eda_export().as_bytes()).unwrap(),
    )
    .unwrap();
    let catalog = BaselineCatalog::load(&paths).unwrap();
    let processor = PhysioProcessor::new(Config::default().physio, &catalog).with_eda(&eda);

    match processor.targets(&table) {
        Err(ComputeError::MissingBaseline {
            statistic,
            participant,
        }) => {
            assert_eq!(statistic, BaselineStatistic::MeanSclBaseline);
            assert_eq!(participant, ParticipantId::new("101"));
        }
        other => panic!("expected MissingBaseline, got {:?}", other),
    }
}

#[test]
fn missing_baseline_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::from_data_dir(dir.path());
    let result = BaselineCatalog::load_only(&paths, &[BaselineStatistic::SdnnBaseline]);
    assert!(matches!(result, Err(ComputeError::Io(_))));
}

#[test]
fn baseline_tables_built_from_feature_records_round_trip() {
    let rows: Vec<FeatureDictionary> = [("101", 2.0), ("101", 4.0), ("102", 1.0)]
        .into_iter()
        .map(|(pp, value)| {
            let mut row = FeatureDictionary::for_participant(ParticipantId::new(pp));
            row.insert("mean_SCL", value);
            row
        })
        .collect();
    let built = BaselineTable::from_feature_rows(
        BaselineStatistic::MeanSclAll,
        &rows,
        "mean_SCL",
        Reduction::Mean,
    );

    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::from_data_dir(dir.path());
    let path = BaselineStatistic::MeanSclAll.path(&paths);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    built.write_csv(fs::File::create(&path).unwrap()).unwrap();

    let catalog = BaselineCatalog::load_only(&paths, &[BaselineStatistic::MeanSclAll]).unwrap();
    let lookup = |pp: &str| catalog.lookup(BaselineStatistic::MeanSclAll, &ParticipantId::new(pp));
    assert_eq!(lookup("101").unwrap(), 3.0);
    assert_eq!(lookup("102").unwrap(), 1.0);
    assert!(lookup("103").is_err());
}

#[test]
fn video_features_from_extractor_csv() {
    // extractor headers carry a leading space after each comma
    let csv = "\
frame, t_from_start, pose_Tx, pose_Rx, AU01_r, AU45_r, AU45_c
1, 0.0, 0.0, 0.0, 0.5, 0.0, 0
2, 1.0, 0.0, 2.0, 0.5, 1.0, 1
3, 2.0, 0.0, 0.0, 0.5, 1.0, 1
4, 3.0, 0.0, 2.0, 0.5, 0.0, 0
5, 4.0, 0.0, 0.0, 0.5, 1.0, 1
";
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pp101_video.csv");
    write(&path, csv);

    let recordings = vec![Recording::from_csv_path(&path).unwrap()];
    let results = process_recordings(&VideoProcessor::default(), &recordings);
    let features = &results[0].as_ref().unwrap().features;

    assert_eq!(features.get("blink_rate"), Some(30.0));
    assert_eq!(features.get("percentage_EC"), Some(0.6));
    assert_eq!(features.get("std_pose_Tx"), Some(0.0));
    assert_eq!(features.get("compound_Motion"), Some(0.0));
    assert_eq!(features.get("mean_AU01"), Some(0.5));
    assert_eq!(features.get("std_AU01"), Some(0.0));
    // constant intensity never rises above its own baseline
    assert_eq!(features.get("mean_Arousal"), Some(0.0));
    assert!(features.get("mean_PD").unwrap().is_nan());

    let json: serde_json::Value = serde_json::to_value(&results[0].as_ref().unwrap()).unwrap();
    assert_eq!(json["recording"], "pp101_video");
    assert!(json["features"]["mean_PD"].is_null());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stress-features.toml");
    write(
        &path,
        r#"
[video]
frame_rate_hz = 30.0
rolling_window_secs = 10.0

[physio]
eda_input = "raw_column"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.video.window_samples(), 300);
    assert_eq!(config.video.arousal_top_k, 5);
    assert_eq!(config.physio.eda_input, DecompositionInput::RawColumn);
    assert_eq!(config.physio.ecg_input, DecompositionInput::RawColumn);
    assert_eq!(config.physio.edge_window_secs, 30);

    let reloaded = Config::from_toml(&config.to_toml().unwrap()).unwrap();
    assert_eq!(reloaded.video.window_samples(), 300);
}
