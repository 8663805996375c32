//! Configuration file schema.
//!
//! Key names follow the established grid configuration format (`R`, `X`,
//! `B`, `S`, `V`, `P`, `Q`), so existing files load unchanged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectFile {
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    pub lines: Vec<LineDef>,
    pub base_quantities: BaseQuantitiesDef,
    #[serde(default)]
    pub algorithm: AlgorithmDef,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus_count: Option<usize>,
    pub slack_voltage: SlackVoltageDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_setpoints: Vec<SetpointDef>,
    #[serde(default)]
    pub service: ServiceDef,
}

impl GridConfig {
    /// Explicit bus count, or one past the highest line endpoint.
    pub fn bus_count(&self) -> usize {
        self.bus_count.unwrap_or_else(|| {
            self.lines
                .iter()
                .map(|l| l.from.max(l.to).saturating_add(1))
                .max()
                .unwrap_or(0)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineDef {
    pub from: usize,
    pub to: usize,
    /// Series resistance (ohm)
    #[serde(rename = "R")]
    pub r: f64,
    /// Series reactance (ohm)
    #[serde(rename = "X")]
    pub x: f64,
    /// Total shunt susceptance (S)
    #[serde(rename = "B", default)]
    pub b: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BaseQuantitiesDef {
    /// Base apparent power (VA)
    #[serde(rename = "S")]
    pub s: f64,
    /// Base voltage (V)
    #[serde(rename = "V")]
    pub v: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmDef {
    #[default]
    #[serde(alias = "CW")]
    CurrentInjection,
    #[serde(alias = "NR")]
    NewtonRaphson,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlackVoltageDef {
    #[serde(default)]
    pub use_trace: bool,
    /// Constant slack voltage, real part (V)
    #[serde(default)]
    pub voltage_real: f64,
    /// Constant slack voltage, imaginary part (V)
    #[serde(default)]
    pub voltage_imaginary: f64,
    /// Headerless CSV of `t, Vreal, Vimag`; relative paths resolve against the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SetpointDef {
    pub bus_index: usize,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "Q")]
    pub q: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_resolve_interval_s: Option<f64>,
    #[serde(default = "default_log_queue_capacity")]
    pub log_queue_capacity: usize,
    #[serde(default = "default_true")]
    pub incremental_updates: bool,
}

impl Default for ServiceDef {
    fn default() -> Self {
        Self {
            idle_resolve_interval_s: None,
            log_queue_capacity: default_log_queue_capacity(),
            incremental_updates: true,
        }
    }
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_max_iterations() -> usize {
    100
}

fn default_log_queue_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}
