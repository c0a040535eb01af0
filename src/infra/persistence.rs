//! Q-table and training-log files.
//!
//! Q-table: CSV with header `state,q0,...,q{n-1}`, one row per state key
//! rendered `distance:direction:obstacle`, sorted by key.
//! Training log: CSV with header `episode,total_reward,success,steps,options,epsilon`.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::planners::{EpisodeSummary, OptionPlanner, QRow, StateKey};

pub const TRAINING_LOG_HEADER: [&str; 6] = [
    "episode",
    "total_reward",
    "success",
    "steps",
    "options",
    "epsilon",
];

/// Write `rows` as Q-table CSV with `num_options` value columns.
pub fn write_q_rows<W: io::Write>(
    writer: W,
    rows: &[QRow],
    num_options: usize,
) -> Result<(), PersistenceError> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["state".to_string()];
    header.extend((0..num_options).map(|i| format!("q{i}")));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.key.to_string()];
        record.extend(
            (0..num_options).map(|i| row.values.get(i).copied().unwrap_or(0.0).to_string()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse Q-table CSV. Rows may have any number of value columns.
pub fn read_q_rows<R: io::Read>(reader: R) -> Result<Vec<QRow>, PersistenceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let row = index + 1;
        let Some(state) = record.get(0) else {
            continue;
        };
        if state.is_empty() {
            continue;
        }

        let key: StateKey = state.parse()?;
        let values = record
            .iter()
            .skip(1)
            .map(|value| {
                value.parse::<f32>().map_err(|_| PersistenceError::Value {
                    row,
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        rows.push(QRow { key, values });
    }
    Ok(rows)
}

/// Returns the number of rows written.
pub fn save_q_table<P: AsRef<Path>>(
    path: P,
    planner: &OptionPlanner,
) -> Result<usize, PersistenceError> {
    let rows = planner.export_rows();
    let file = File::create(path.as_ref())?;
    write_q_rows(file, &rows, planner.num_options())?;
    info!("Saved {} Q-table rows to {}", rows.len(), path.as_ref().display());
    Ok(rows.len())
}

/// Returns the number of rows loaded.
pub fn load_q_table<P: AsRef<Path>>(
    path: P,
    planner: &mut OptionPlanner,
) -> Result<usize, PersistenceError> {
    let file = File::open(path.as_ref())?;
    let rows = read_q_rows(file)?;
    let count = rows.len();
    let truncated = planner.import_rows(rows);
    if truncated > 0 {
        warn!(
            "{} Q-table rows had more than {} values and were truncated",
            truncated,
            planner.num_options()
        );
    }
    info!("Loaded {} Q-table rows from {}", count, path.as_ref().display());
    Ok(count)
}

/// Appends one CSV row per finished episode, flushing after each.
pub struct TrainingLog<W: io::Write> {
    writer: csv::Writer<W>,
}

impl TrainingLog<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        Self::new(File::create(path)?)
    }
}

impl<W: io::Write> TrainingLog<W> {
    pub fn new(writer: W) -> Result<Self, PersistenceError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(TRAINING_LOG_HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn append(&mut self, summary: &EpisodeSummary) -> Result<(), PersistenceError> {
        self.writer.write_record([
            summary.episode.to_string(),
            summary.total_reward.to_string(),
            u8::from(summary.success).to_string(),
            summary.steps.to_string(),
            summary.options.to_string(),
            summary.epsilon.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}
