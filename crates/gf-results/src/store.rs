//! CSV snapshot log.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use gf_sim::GridSnapshot;
use serde::Serialize;

use crate::{ResultsError, ResultsResult};

pub const BUS_LOG_FILE: &str = "grid_bus.csv";
pub const LINE_LOG_FILE: &str = "grid_line.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Serialize)]
struct BusRow<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: &'a str,
    #[serde(rename = "BusIndex")]
    bus_index: usize,
    #[serde(rename = "P")]
    p: f64,
    #[serde(rename = "Q")]
    q: f64,
    #[serde(rename = "Vm")]
    vm: f64,
    #[serde(rename = "Va")]
    va: f64,
}

#[derive(Serialize)]
struct LineRow<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: &'a str,
    #[serde(rename = "Line #")]
    line: usize,
    #[serde(rename = "LineCurrent")]
    current: f64,
}

/// Bus and line log files in one directory; one row per bus/line per snapshot.
pub struct SnapshotLog {
    dir: PathBuf,
    bus: csv::Writer<File>,
    line: csv::Writer<File>,
    written: u64,
}

impl SnapshotLog {
    /// Create (or truncate) both log files under `dir`.
    pub fn create(dir: &Path) -> ResultsResult<Self> {
        if dir.exists() && !dir.is_dir() {
            return Err(ResultsError::InvalidPath {
                message: format!("{} is not a directory", dir.display()),
            });
        }
        fs::create_dir_all(dir)?;

        let mut bus = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(dir.join(BUS_LOG_FILE))?;
        bus.write_record(["Timestamp", "BusIndex", "P", "Q", "Vm", "Va"])?;
        bus.flush()?;

        let mut line = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(dir.join(LINE_LOG_FILE))?;
        line.write_record(["Timestamp", "Line #", "LineCurrent"])?;
        line.flush()?;

        Ok(Self {
            dir: dir.to_path_buf(),
            bus,
            line,
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshots appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one snapshot and flush both files.
    pub fn append(&mut self, snapshot: &GridSnapshot) -> ResultsResult<()> {
        let timestamp = snapshot.published_at.format(TIMESTAMP_FORMAT).to_string();
        let state = &snapshot.state;

        for (bus_index, (((&p, &q), &vm), &va)) in state
            .p
            .iter()
            .zip(&state.q)
            .zip(&state.vm)
            .zip(&state.va)
            .enumerate()
        {
            self.bus.serialize(BusRow {
                timestamp: &timestamp,
                bus_index,
                p,
                q,
                vm,
                va,
            })?;
        }
        for (line, &current) in state.line_currents.iter().enumerate() {
            self.line.serialize(LineRow {
                timestamp: &timestamp,
                line,
                current,
            })?;
        }

        self.bus.flush()?;
        self.line.flush()?;
        self.written += 1;
        Ok(())
    }
}
