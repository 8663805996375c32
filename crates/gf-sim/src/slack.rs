//! Slack bus voltage sources.

use std::fs::File;
use std::io;
use std::path::Path;

use gf_solver::Complex64;

use crate::error::{SimError, SimResult};

/// One trace row: time (s, relative to the first row) and voltage (V).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub t: f64,
    pub voltage: Complex64,
}

/// A recorded slack voltage trace with a forward-only lookup pointer.
///
/// Lookups assume non-decreasing query times. The pointer advances to the
/// nearest sample and never moves back; once it reaches the last sample it
/// stays there.
#[derive(Debug, Clone)]
pub struct SlackVoltageTrace {
    samples: Vec<TraceSample>,
    pointer: usize,
}

impl SlackVoltageTrace {
    /// Build a trace from `(t, voltage)` rows. Times are shifted so that the
    /// first row is at zero and must be non-decreasing.
    pub fn from_samples(rows: impl IntoIterator<Item = (f64, Complex64)>) -> SimResult<Self> {
        let rows: Vec<(f64, Complex64)> = rows.into_iter().collect();
        let Some(&(t0, _)) = rows.first() else {
            return Err(SimError::InvalidTrace {
                what: "trace has no samples".to_string(),
            });
        };

        let mut samples = Vec::with_capacity(rows.len());
        for (row, (t, v)) in rows.into_iter().enumerate() {
            if !(t.is_finite() && v.re.is_finite() && v.im.is_finite()) {
                return Err(SimError::InvalidTrace {
                    what: format!("row {} has a non-finite value", row + 1),
                });
            }
            if v.norm() <= 0.0 {
                return Err(SimError::InvalidTrace {
                    what: format!("row {} has zero voltage magnitude", row + 1),
                });
            }
            let t = t - t0;
            if let Some(prev) = samples.last().map(|s: &TraceSample| s.t)
                && t < prev
            {
                return Err(SimError::InvalidTrace {
                    what: format!("row {} goes back in time ({t} < {prev})", row + 1),
                });
            }
            samples.push(TraceSample { t, voltage: v });
        }

        Ok(Self {
            samples,
            pointer: 0,
        })
    }

    /// Read a headerless CSV of `t, Vreal, Vimag` rows.
    pub fn from_reader<R: io::Read>(reader: R) -> SimResult<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv.deserialize::<(f64, f64, f64)>() {
            let (t, re, im) = record.map_err(|e| SimError::InvalidTrace {
                what: e.to_string(),
            })?;
            rows.push((t, Complex64::new(re, im)));
        }
        Self::from_samples(rows)
    }

    pub fn from_path(path: &Path) -> SimResult<Self> {
        let file = File::open(path).map_err(|e| SimError::TraceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[TraceSample] {
        &self.samples
    }

    /// Index of the sample returned by the last lookup.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// True once the pointer has latched to the final sample.
    pub fn is_exhausted(&self) -> bool {
        self.pointer + 1 == self.samples.len()
    }

    /// Voltage of the sample nearest to `t`, searching forward only.
    pub fn voltage_at(&mut self, t: f64) -> Complex64 {
        while let Some(next) = self.samples.get(self.pointer + 1) {
            let current = &self.samples[self.pointer];
            if (t - next.t).abs() > (t - current.t).abs() {
                break;
            }
            self.pointer += 1;
        }
        self.samples[self.pointer].voltage
    }
}

/// Where the slack voltage comes from.
#[derive(Debug, Clone)]
pub enum SlackVoltageSource {
    Constant(Complex64),
    Trace(SlackVoltageTrace),
}

impl SlackVoltageSource {
    /// Slack voltage (V) for elapsed time `t` (s).
    pub fn voltage_at(&mut self, t: f64) -> Complex64 {
        match self {
            SlackVoltageSource::Constant(v) => *v,
            SlackVoltageSource::Trace(trace) => trace.voltage_at(t),
        }
    }

    pub fn is_trace(&self) -> bool {
        matches!(self, SlackVoltageSource::Trace(_))
    }
}
