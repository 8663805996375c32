//! Topology and base-quantity errors.

use gf_core::{BusId, LineId};

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Network construction and validation errors.
///
/// All variants are configuration errors: fatal at construction, never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The line set is empty.
    NoLines,

    /// A line endpoint is not a valid bus index.
    BusOutOfRange {
        line: LineId,
        bus: usize,
        bus_count: usize,
    },

    /// A line connects a bus to itself.
    SelfLoop { line: LineId, bus: BusId },

    /// Series impedance R + jX is exactly zero.
    ZeroImpedance { line: LineId },

    /// A line parameter is NaN or infinite.
    NonFiniteParameter { line: LineId, what: &'static str },

    /// More buses than a connected network over the given lines can have.
    TooManyBuses { bus_count: usize, line_count: usize },

    /// A bus index does not fit the compact bus id.
    BusIndexTooLarge { line: usize, bus: usize },

    /// A bus has no path to the slack bus.
    Disconnected { bus: BusId },

    /// A base quantity is not strictly positive and finite.
    InvalidBase { what: &'static str },
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::NoLines => write!(f, "Network has no lines"),
            NetworkError::BusOutOfRange {
                line,
                bus,
                bus_count,
            } => {
                write!(
                    f,
                    "Line {} refers to bus {} but the network has {} buses",
                    line, bus, bus_count
                )
            }
            NetworkError::SelfLoop { line, bus } => {
                write!(f, "Line {} connects bus {} to itself", line, bus)
            }
            NetworkError::ZeroImpedance { line } => {
                write!(f, "Line {} has zero series impedance", line)
            }
            NetworkError::NonFiniteParameter { line, what } => {
                write!(f, "Line {} has a non-finite {}", line, what)
            }
            NetworkError::TooManyBuses {
                bus_count,
                line_count,
            } => {
                write!(
                    f,
                    "{} buses cannot all be connected to the slack bus by {} lines",
                    bus_count, line_count
                )
            }
            NetworkError::BusIndexTooLarge { line, bus } => {
                write!(f, "Line {} refers to bus {}, which is too large", line, bus)
            }
            NetworkError::Disconnected { bus } => {
                write!(f, "Bus {} is not connected to the slack bus", bus)
            }
            NetworkError::InvalidBase { what } => {
                write!(f, "Base quantity {} must be positive and finite", what)
            }
        }
    }
}

impl std::error::Error for NetworkError {}
