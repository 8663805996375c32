//! Core topology data structures.

use gf_core::{BusId, LineId};

/// A distribution line between two buses.
///
/// `b` is the total shunt susceptance, split half at each end.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub from: BusId,
    pub to: BusId,
    /// Series resistance (ohm)
    pub r: f64,
    /// Series reactance (ohm)
    pub x: f64,
    /// Total shunt susceptance (S)
    pub b: f64,
}

impl Line {
    /// The endpoint opposite `bus`, if `bus` is an endpoint.
    pub fn other_end(&self, bus: BusId) -> Option<BusId> {
        if bus == self.from {
            Some(self.to)
        } else if bus == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

/// The network: a validated, immutable set of buses and lines.
///
/// Bus 0 is the slack bus; buses `1..N` are PQ buses. Topology is fixed for
/// the lifetime of the value.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) bus_count: usize,
    pub(crate) lines: Vec<Line>,

    /// Offsets for bus->line adjacency: bus i's lines are in bus_lines[bus_line_offsets[i]..bus_line_offsets[i+1]].
    pub(crate) bus_line_offsets: Vec<usize>,

    /// Flat list of line IDs incident to buses (sorted by bus then line for determinism).
    pub(crate) bus_lines: Vec<LineId>,
}

impl Network {
    /// Number of buses N, slack included.
    pub fn bus_count(&self) -> usize {
        self.bus_count
    }

    /// Number of PQ buses (N - 1).
    pub fn pq_bus_count(&self) -> usize {
        self.bus_count - 1
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Return all lines in configuration order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Get a line by ID (returns None if ID out of bounds).
    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(id.as_usize())
    }

    /// Lines incident to a bus.
    pub fn bus_lines(&self, bus: BusId) -> &[LineId] {
        let idx = bus.as_usize();
        if idx >= self.bus_count {
            return &[];
        }
        let start = self.bus_line_offsets[idx];
        let end = self.bus_line_offsets[idx + 1];
        &self.bus_lines[start..end]
    }

    /// Buses directly connected to `bus` by at least one line.
    pub fn neighbors(&self, bus: BusId) -> impl Iterator<Item = BusId> + '_ {
        self.bus_lines(bus)
            .iter()
            .filter_map(move |&id| self.line(id).and_then(|l| l.other_end(bus)))
    }

    /// Whether a bus index addresses a PQ bus.
    pub fn is_pq_bus(&self, index: usize) -> bool {
        index >= 1 && index < self.bus_count
    }
}
