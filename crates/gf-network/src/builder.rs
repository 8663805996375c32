//! Incremental network builder.

use gf_core::{BusId, LineId};

use crate::error::NetworkResult;
use crate::network::{Line, Network};
use crate::validate;

/// A line as given by configuration, before endpoint validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawLine {
    pub from: usize,
    pub to: usize,
    pub r: f64,
    pub x: f64,
    pub b: f64,
}

/// Builder for constructing a network incrementally.
///
/// Use `add_line` to build up the line set, then call `build()` to validate
/// and freeze it into an immutable `Network`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    lines: Vec<RawLine>,
    bus_count: Option<usize>,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the bus count explicitly.
    ///
    /// Without it the count is inferred as the largest endpoint index + 1,
    /// and no endpoint can be out of range.
    pub fn with_bus_count(mut self, bus_count: usize) -> Self {
        self.bus_count = Some(bus_count);
        self
    }

    /// Add a line between two 0-based bus indices and return its ID.
    pub fn add_line(&mut self, from: usize, to: usize, r: f64, x: f64, b: f64) -> LineId {
        let id = LineId::from_index(self.lines.len() as u32);
        self.lines.push(RawLine { from, to, r, x, b });
        id
    }

    /// Number of lines added so far.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Build and validate the network.
    pub fn build(self) -> NetworkResult<Network> {
        let bus_count = match self.bus_count {
            Some(n) => n,
            None => validate::inferred_bus_count(&self.lines)?,
        };

        validate::validate_lines(&self.lines, bus_count)?;

        let lines: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, raw)| Line {
                id: LineId::from_index(i as u32),
                from: BusId::from_index(raw.from as u32),
                to: BusId::from_index(raw.to as u32),
                r: raw.r,
                x: raw.x,
                b: raw.b,
            })
            .collect();

        let (bus_line_offsets, bus_lines) = Self::build_adjacency(bus_count, &lines);

        validate::validate_connectivity(bus_count, &lines, &bus_line_offsets, &bus_lines)?;

        Ok(Network {
            bus_count,
            lines,
            bus_line_offsets,
            bus_lines,
        })
    }

    /// Build compact adjacency lists: for each bus, collect its incident lines.
    fn build_adjacency(bus_count: usize, lines: &[Line]) -> (Vec<usize>, Vec<LineId>) {
        let mut per_bus: Vec<Vec<LineId>> = vec![Vec::new(); bus_count];
        for line in lines {
            per_bus[line.from.as_usize()].push(line.id);
            per_bus[line.to.as_usize()].push(line.id);
        }

        let mut offsets = Vec::with_capacity(bus_count + 1);
        let mut flat = Vec::with_capacity(lines.len() * 2);
        offsets.push(0);
        for mut list in per_bus {
            list.sort();
            flat.extend(list);
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}
