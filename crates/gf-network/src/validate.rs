//! Topology validation logic.

use std::collections::VecDeque;

use gf_core::{BusId, LineId, SLACK_BUS};

use crate::builder::RawLine;
use crate::error::{NetworkError, NetworkResult};
use crate::network::Line;

/// Largest bus index a line may use; `Id` stores `index + 1` in a `u32`.
const MAX_BUS_INDEX: usize = u32::MAX as usize - 1;

/// Bus count implied by the line set: largest endpoint + 1.
pub(crate) fn inferred_bus_count(lines: &[RawLine]) -> NetworkResult<usize> {
    let (line, bus) = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i, l.from.max(l.to)))
        .max_by_key(|&(_, bus)| bus)
        .ok_or(NetworkError::NoLines)?;
    bus.checked_add(1)
        .ok_or(NetworkError::BusIndexTooLarge { line, bus })
}

/// Validate per-line data: endpoints in range, no self loops, usable parameters.
pub(crate) fn validate_lines(lines: &[RawLine], bus_count: usize) -> NetworkResult<()> {
    if lines.is_empty() {
        return Err(NetworkError::NoLines);
    }
    // A spanning tree over N buses needs N - 1 lines; checked before any per-bus allocation
    if bus_count > lines.len().saturating_add(1) {
        return Err(NetworkError::TooManyBuses {
            bus_count,
            line_count: lines.len(),
        });
    }

    for (i, raw) in lines.iter().enumerate() {
        for bus in [raw.from, raw.to] {
            if bus > MAX_BUS_INDEX {
                return Err(NetworkError::BusIndexTooLarge { line: i, bus });
            }
        }
        let line = LineId::from_index(i as u32);

        for bus in [raw.from, raw.to] {
            if bus >= bus_count {
                return Err(NetworkError::BusOutOfRange {
                    line,
                    bus,
                    bus_count,
                });
            }
        }

        if raw.from == raw.to {
            return Err(NetworkError::SelfLoop {
                line,
                bus: BusId::from_index(raw.from as u32),
            });
        }

        for (value, what) in [(raw.r, "resistance"), (raw.x, "reactance"), (raw.b, "susceptance")] {
            if !value.is_finite() {
                return Err(NetworkError::NonFiniteParameter { line, what });
            }
        }

        if raw.r == 0.0 && raw.x == 0.0 {
            return Err(NetworkError::ZeroImpedance { line });
        }
    }

    Ok(())
}

/// Every bus must be reachable from the slack bus.
pub(crate) fn validate_connectivity(
    bus_count: usize,
    lines: &[Line],
    bus_line_offsets: &[usize],
    bus_lines: &[LineId],
) -> NetworkResult<()> {
    let mut visited = vec![false; bus_count];
    let mut queue = VecDeque::new();
    visited[SLACK_BUS.as_usize()] = true;
    queue.push_back(SLACK_BUS);

    while let Some(bus) = queue.pop_front() {
        let idx = bus.as_usize();
        for &line_id in &bus_lines[bus_line_offsets[idx]..bus_line_offsets[idx + 1]] {
            let line = &lines[line_id.as_usize()];
            if let Some(next) = line.other_end(bus)
                && !visited[next.as_usize()]
            {
                visited[next.as_usize()] = true;
                queue.push_back(next);
            }
        }
    }

    match visited.iter().position(|v| !v) {
        Some(bus) => Err(NetworkError::Disconnected {
            bus: BusId::from_index(bus as u32),
        }),
        None => Ok(()),
    }
}
