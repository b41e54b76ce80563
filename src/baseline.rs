//! Participant baseline statistics
//!
//! Each statistic is computed once upstream per participant (from a dedicated
//! resting recording, or across all task recordings) and persisted as a
//! two-column table `pp,<value column>`. During target computation the tables
//! are read-only; a participant missing from a table is a hard failure.

use crate::aggregate;
use crate::config::DataPaths;
use crate::error::ComputeError;
use crate::types::{FeatureDictionary, ParticipantId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Persisted per-participant statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineStatistic {
    /// Mean SCL during the baseline recording
    MeanSclBaseline,
    /// Minimum SCL during the baseline recording
    MinSclBaseline,
    /// Mean SCL over all task recordings
    MeanSclAll,
    /// SCL standard deviation over all task recordings
    StdSclAll,
    /// Maximum SCL over all task recordings
    MaxSclAll,
    /// HRV MeanNN during the baseline recording
    MeanNnBaseline,
    /// HRV RMSSD during the baseline recording
    RmssdBaseline,
    /// HRV SDNN during the baseline recording
    SdnnBaseline,
}

/// Which stats directory a table lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsDir {
    Scl,
    Hrv,
}

impl BaselineStatistic {
    pub const ALL: [BaselineStatistic; 8] = [
        BaselineStatistic::MeanSclBaseline,
        BaselineStatistic::MinSclBaseline,
        BaselineStatistic::MeanSclAll,
        BaselineStatistic::StdSclAll,
        BaselineStatistic::MaxSclAll,
        BaselineStatistic::MeanNnBaseline,
        BaselineStatistic::RmssdBaseline,
        BaselineStatistic::SdnnBaseline,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            BaselineStatistic::MeanSclBaseline => "PP_meanSCL_Baseline.csv",
            BaselineStatistic::MinSclBaseline => "PP_minSCL_Baseline.csv",
            BaselineStatistic::MeanSclAll => "PP_meanSCL_all.csv",
            BaselineStatistic::StdSclAll => "PP_stdSCL_all.csv",
            BaselineStatistic::MaxSclAll => "PP_maxSCL_all.csv",
            BaselineStatistic::MeanNnBaseline => "PP_MeanNN_Baseline.csv",
            BaselineStatistic::RmssdBaseline => "PP_RMSSD_Baseline.csv",
            BaselineStatistic::SdnnBaseline => "PP_SDNN_Baseline.csv",
        }
    }

    /// Name of the value column in the persisted table
    pub fn value_column(&self) -> &'static str {
        match self {
            BaselineStatistic::MeanSclBaseline | BaselineStatistic::MeanSclAll => "mean_SCL",
            BaselineStatistic::MinSclBaseline => "min_SCL",
            BaselineStatistic::StdSclAll => "std_SCL",
            BaselineStatistic::MaxSclAll => "max_SCL",
            BaselineStatistic::MeanNnBaseline => "HRV_MeanNN",
            BaselineStatistic::RmssdBaseline => "HRV_RMSSD",
            BaselineStatistic::SdnnBaseline => "HRV_SDNN",
        }
    }

    pub fn stats_dir(&self) -> StatsDir {
        match self {
            BaselineStatistic::MeanNnBaseline
            | BaselineStatistic::RmssdBaseline
            | BaselineStatistic::SdnnBaseline => StatsDir::Hrv,
            _ => StatsDir::Scl,
        }
    }

    /// Full path of the table under `paths`
    pub fn path(&self, paths: &DataPaths) -> std::path::PathBuf {
        match self.stats_dir() {
            StatsDir::Scl => paths.scl_stats_dir.join(self.file_name()),
            StatsDir::Hrv => paths.hrv_stats_dir.join(self.file_name()),
        }
    }
}

impl fmt::Display for BaselineStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name().trim_end_matches(".csv"))
    }
}

/// How feature rows of one participant are reduced into a statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Mean,
    Min,
    Max,
    Std,
}

impl Reduction {
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Reduction::Mean => aggregate::mean(values),
            Reduction::Min => aggregate::min(values),
            Reduction::Max => aggregate::max(values),
            Reduction::Std => aggregate::std(values),
        }
    }
}

/// One persisted statistic: participant id to scalar
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineTable {
    statistic: BaselineStatistic,
    values: HashMap<ParticipantId, f64>,
}

impl BaselineTable {
    pub fn new(statistic: BaselineStatistic) -> Self {
        Self {
            statistic,
            values: HashMap::new(),
        }
    }

    pub fn with_values<I>(statistic: BaselineStatistic, values: I) -> Self
    where
        I: IntoIterator<Item = (ParticipantId, f64)>,
    {
        Self {
            statistic,
            values: values.into_iter().collect(),
        }
    }

    pub fn statistic(&self) -> BaselineStatistic {
        self.statistic
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn insert(&mut self, participant: ParticipantId, value: f64) {
        self.values.insert(participant, value);
    }

    /// Value for `participant`, or `MissingBaseline`
    pub fn lookup(&self, participant: &ParticipantId) -> Result<f64, ComputeError> {
        self.values
            .get(participant)
            .copied()
            .ok_or_else(|| ComputeError::MissingBaseline {
                statistic: self.statistic,
                participant: participant.clone(),
            })
    }

    /// Read a table whose first column is the participant id and which has a
    /// column named after the statistic's value column.
    pub fn from_csv_reader<R: Read>(
        statistic: BaselineStatistic,
        reader: R,
    ) -> Result<Self, ComputeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let value_idx = headers
            .iter()
            .position(|h| h == statistic.value_column())
            .ok_or_else(|| {
                ComputeError::SchemaError(format!(
                    "{} has no {} column",
                    statistic.file_name(),
                    statistic.value_column()
                ))
            })?;

        let mut table = BaselineTable::new(statistic);
        for (row_num, record) in csv_reader.records().enumerate() {
            let record = record?;
            let id = record.get(0).unwrap_or_default();
            let raw = record.get(value_idx).unwrap_or_default();
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse::<f64>().map_err(|e| {
                    ComputeError::ParseError(format!(
                        "{} row {}: {}",
                        statistic.file_name(),
                        row_num + 1,
                        e
                    ))
                })?
            };
            table.insert(normalize_id(id), value);
        }
        debug!(%statistic, participants = table.len(), "loaded baseline table");
        Ok(table)
    }

    pub fn from_csv_path(statistic: BaselineStatistic, path: &Path) -> Result<Self, ComputeError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(statistic, file)
    }

    /// Write the table as `pp,<value column>`, sorted by participant.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ComputeError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["pp", self.statistic.value_column()])?;
        let sorted: BTreeMap<&ParticipantId, f64> =
            self.values.iter().map(|(k, v)| (k, *v)).collect();
        for (participant, value) in sorted {
            let cell = if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            };
            csv_writer.write_record([participant.as_str(), cell.as_str()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Build a statistic from per-recording feature rows, grouped by participant.
    ///
    /// Rows without a participant id or without `feature` are skipped.
    pub fn from_feature_rows(
        statistic: BaselineStatistic,
        rows: &[FeatureDictionary],
        feature: &str,
        reduction: Reduction,
    ) -> Self {
        let mut grouped: BTreeMap<ParticipantId, Vec<f64>> = BTreeMap::new();
        for row in rows {
            if let (Some(pp), Some(value)) = (&row.participant, row.get(feature)) {
                grouped.entry(pp.clone()).or_default().push(value);
            }
        }
        let table = BaselineTable::with_values(
            statistic,
            grouped
                .into_iter()
                .map(|(pp, values)| (pp, reduction.apply(&values))),
        );
        info!(%statistic, feature, participants = table.len(), "built baseline table");
        table
    }
}

/// Ids read from baseline tables may carry a float suffix (`101.0`).
fn normalize_id(raw: &str) -> ParticipantId {
    match raw.trim().parse::<f64>() {
        Ok(value) => ParticipantId::from_numeric(value).unwrap_or_else(|| ParticipantId::new(raw)),
        Err(_) => ParticipantId::new(raw),
    }
}

/// Loaded baseline tables, shared read-only across recordings
#[derive(Debug, Clone, Default)]
pub struct BaselineCatalog {
    tables: HashMap<BaselineStatistic, BaselineTable>,
}

impl BaselineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: BaselineTable) {
        self.tables.insert(table.statistic(), table);
    }

    pub fn with_table(mut self, table: BaselineTable) -> Self {
        self.insert(table);
        self
    }

    /// Load every statistic from its conventional location.
    pub fn load(paths: &DataPaths) -> Result<Self, ComputeError> {
        Self::load_only(paths, &BaselineStatistic::ALL)
    }

    /// Load the listed statistics only.
    pub fn load_only(
        paths: &DataPaths,
        statistics: &[BaselineStatistic],
    ) -> Result<Self, ComputeError> {
        let mut catalog = Self::new();
        for statistic in statistics {
            let path = statistic.path(paths);
            let table = BaselineTable::from_csv_path(*statistic, &path).map_err(|e| match e {
                ComputeError::Io(io) => ComputeError::Io(std::io::Error::new(
                    io.kind(),
                    format!("{}: {}", path.display(), io),
                )),
                other => other,
            })?;
            catalog.insert(table);
        }
        Ok(catalog)
    }

    pub fn table(&self, statistic: BaselineStatistic) -> Option<&BaselineTable> {
        self.tables.get(&statistic)
    }

    /// Value of `statistic` for `participant`; fails if either is absent.
    pub fn lookup(
        &self,
        statistic: BaselineStatistic,
        participant: &ParticipantId,
    ) -> Result<f64, ComputeError> {
        self.tables
            .get(&statistic)
            .ok_or(ComputeError::BaselineUnavailable(statistic))?
            .lookup(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_missing_participant_is_error() {
        let table = BaselineTable::with_values(
            BaselineStatistic::MeanSclBaseline,
            [(ParticipantId::new("101"), 3.5)],
        );

        assert_eq!(table.lookup(&ParticipantId::new("101")).unwrap(), 3.5);
        let err = table.lookup(&ParticipantId::new("999")).unwrap_err();
        match err {
            ComputeError::MissingBaseline {
                statistic,
                participant,
            } => {
                assert_eq!(statistic, BaselineStatistic::MeanSclBaseline);
                assert_eq!(participant.as_str(), "999");
            }
            other => panic!("expected MissingBaseline, got {other:?}"),
        }
    }

    #[test]
    fn test_read_indexed_csv() {
        let csv = ",mean_SCL\n101,2.5\n102.0,3.0\nP07,\n";
        let table =
            BaselineTable::from_csv_reader(BaselineStatistic::MeanSclAll, csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(&ParticipantId::new("101")).unwrap(), 2.5);
        assert_eq!(table.lookup(&ParticipantId::new("102")).unwrap(), 3.0);
        assert!(table.lookup(&ParticipantId::new("P07")).unwrap().is_nan());
    }

    #[test]
    fn test_missing_value_column() {
        let csv = "pp,HRV_SDNN\n1,40\n";
        let result = BaselineTable::from_csv_reader(BaselineStatistic::RmssdBaseline, csv.as_bytes());
        assert!(matches!(result, Err(ComputeError::SchemaError(_))));
    }

    #[test]
    fn test_catalog_unavailable_table() {
        let catalog = BaselineCatalog::new();
        let result = catalog.lookup(BaselineStatistic::SdnnBaseline, &ParticipantId::new("1"));
        assert!(matches!(
            result,
            Err(ComputeError::BaselineUnavailable(BaselineStatistic::SdnnBaseline))
        ));
    }

    #[test]
    fn test_from_feature_rows() {
        let row = |pp: &str, v: f64| {
            let mut d = FeatureDictionary::for_participant(ParticipantId::new(pp));
            d.insert("min_SCL", v);
            d
        };
        let rows = vec![row("1", 2.0), row("1", 1.0), row("2", 5.0), FeatureDictionary::new()];

        let table = BaselineTable::from_feature_rows(
            BaselineStatistic::MinSclBaseline,
            &rows,
            "min_SCL",
            Reduction::Min,
        );

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(&ParticipantId::new("1")).unwrap(), 1.0);
        assert_eq!(table.lookup(&ParticipantId::new("2")).unwrap(), 5.0);
    }

    #[test]
    fn test_write_then_read() {
        let table = BaselineTable::with_values(
            BaselineStatistic::RmssdBaseline,
            [(ParticipantId::new("2"), 41.5), (ParticipantId::new("1"), 38.0)],
        );
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text, "pp,HRV_RMSSD\n1,38\n2,41.5\n");

        let back =
            BaselineTable::from_csv_reader(BaselineStatistic::RmssdBaseline, buffer.as_slice())
                .unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_paths() {
        let paths = DataPaths::from_data_dir(Path::new("/d"));
        assert_eq!(
            BaselineStatistic::SdnnBaseline.path(&paths),
            Path::new("/d/information/HRV stats/PP_SDNN_Baseline.csv")
        );
        assert_eq!(BaselineStatistic::MaxSclAll.to_string(), "PP_maxSCL_all");
    }
}
