//! Configuration validation.

use std::collections::HashSet;

use crate::schema::{GridConfig, ProjectFile};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate initial setpoint for bus {bus}")]
    DuplicateSetpoint { bus: usize },

    #[error("Missing field: {field} ({reason})")]
    Missing { field: String, reason: String },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &ProjectFile) -> Result<(), ValidationError> {
    validate_config(&project.grid)
}

pub fn validate_config(grid: &GridConfig) -> Result<(), ValidationError> {
    let base = grid.base_quantities;
    if !(base.s.is_finite() && base.s > 0.0) {
        return Err(invalid("base_quantities.S", base.s, "must be positive"));
    }
    if !(base.v.is_finite() && base.v > 0.0) {
        return Err(invalid("base_quantities.V", base.v, "must be positive"));
    }
    if !(grid.tolerance.is_finite() && grid.tolerance > 0.0) {
        return Err(invalid("tolerance", grid.tolerance, "must be positive"));
    }
    if grid.max_iterations == 0 {
        return Err(invalid("max_iterations", 0, "must be at least 1"));
    }

    if grid.lines.is_empty() {
        return Err(ValidationError::Missing {
            field: "lines".to_string(),
            reason: "at least one line is required".to_string(),
        });
    }
    for (i, line) in grid.lines.iter().enumerate() {
        if line.from == line.to {
            return Err(invalid(format!("lines[{i}]"), line.from, "endpoints must differ"));
        }
        for (name, value) in [("R", line.r), ("X", line.x), ("B", line.b)] {
            if !value.is_finite() {
                return Err(invalid(format!("lines[{i}].{name}"), value, "must be finite"));
            }
        }
        if line.r == 0.0 && line.x == 0.0 {
            return Err(invalid(format!("lines[{i}]"), "R = X = 0", "zero series impedance"));
        }
    }

    let line_count = grid.lines.len();
    let highest = grid.lines.iter().map(|l| l.from.max(l.to)).max().unwrap_or(0);
    // N buses need at least N - 1 lines to reach the slack bus
    if highest > line_count {
        return Err(invalid(
            "lines",
            highest,
            &format!("bus index exceeds what {line_count} lines can connect"),
        ));
    }
    if let Some(n) = grid.bus_count {
        if n <= highest {
            return Err(invalid(
                "bus_count",
                n,
                &format!("lines reference bus {highest}"),
            ));
        }
        if n > line_count + 1 {
            return Err(invalid(
                "bus_count",
                n,
                &format!("{line_count} lines connect at most {} buses", line_count + 1),
            ));
        }
    }
    let bus_count = grid.bus_count();

    let slack = &grid.slack_voltage;
    if slack.use_trace {
        if slack.trace_file_path.is_none() {
            return Err(ValidationError::Missing {
                field: "slack_voltage.trace_file_path".to_string(),
                reason: "required when use_trace is true".to_string(),
            });
        }
    } else {
        for (name, value) in [
            ("voltage_real", slack.voltage_real),
            ("voltage_imaginary", slack.voltage_imaginary),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("slack_voltage.{name}"), value, "must be finite"));
            }
        }
        if slack.voltage_real == 0.0 && slack.voltage_imaginary == 0.0 {
            return Err(invalid("slack_voltage", "0 + 0j", "slack voltage must be non-zero"));
        }
    }

    let mut seen = HashSet::new();
    for sp in &grid.initial_setpoints {
        if sp.bus_index == 0 || sp.bus_index >= bus_count {
            return Err(invalid(
                "initial_setpoints.bus_index",
                sp.bus_index,
                &format!("must be a PQ bus in 1..={}", bus_count.saturating_sub(1)),
            ));
        }
        if !(sp.p.is_finite() && sp.q.is_finite()) {
            return Err(invalid(
                format!("initial_setpoints[bus {}]", sp.bus_index),
                format!("P = {}, Q = {}", sp.p, sp.q),
                "must be finite",
            ));
        }
        if !seen.insert(sp.bus_index) {
            return Err(ValidationError::DuplicateSetpoint { bus: sp.bus_index });
        }
    }

    if let Some(interval) = grid.service.idle_resolve_interval_s
        && !(interval.is_finite() && interval > 0.0)
    {
        return Err(invalid(
            "service.idle_resolve_interval_s",
            interval,
            "must be positive",
        ));
    }
    if grid.service.log_queue_capacity == 0 {
        return Err(invalid("service.log_queue_capacity", 0, "must be at least 1"));
    }

    Ok(())
}
