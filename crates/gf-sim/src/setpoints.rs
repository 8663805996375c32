//! Per-bus setpoint bookkeeping.

use std::collections::BTreeMap;

use crate::error::{SimError, SimResult};

/// A requested power injection for one PQ bus (W / var, generation positive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointCommand {
    pub bus_index: usize,
    pub p: f64,
    pub q: f64,
}

impl SetpointCommand {
    pub fn new(bus_index: usize, p: f64, q: f64) -> Self {
        Self { bus_index, p, q }
    }
}

/// Collapse a drained batch to one `(P, Q)` per bus; later commands win.
pub fn coalesce(batch: &[SetpointCommand]) -> BTreeMap<usize, (f64, f64)> {
    let mut merged = BTreeMap::new();
    for cmd in batch {
        merged.insert(cmd.bus_index, (cmd.p, cmd.q));
    }
    merged
}

/// Current resolved setpoints of every PQ bus.
///
/// Bus `i` (1-based, slack excluded) is stored at position `i - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointBook {
    p: Vec<f64>,
    q: Vec<f64>,
}

impl SetpointBook {
    /// All PQ buses at zero injection.
    pub fn new(pq_bus_count: usize) -> Self {
        Self {
            p: vec![0.0; pq_bus_count],
            q: vec![0.0; pq_bus_count],
        }
    }

    pub fn pq_bus_count(&self) -> usize {
        self.p.len()
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    /// `(P, Q)` of a PQ bus, or `None` for the slack or an unknown bus.
    pub fn get(&self, bus: usize) -> Option<(f64, f64)> {
        let idx = bus.checked_sub(1)?;
        Some((*self.p.get(idx)?, *self.q.get(idx)?))
    }

    pub fn set(&mut self, bus: usize, p: f64, q: f64) -> SimResult<()> {
        let count = self.pq_bus_count();
        if bus == 0 || bus > count {
            return Err(SimError::InvalidSetpoint {
                what: format!("bus {bus} is not a PQ bus (valid: 1..={count})"),
            });
        }
        if !(p.is_finite() && q.is_finite()) {
            return Err(SimError::InvalidSetpoint {
                what: format!("non-finite P/Q for bus {bus}"),
            });
        }
        self.p[bus - 1] = p;
        self.q[bus - 1] = q;
        Ok(())
    }

    /// Apply coalesced setpoints. All entries are checked before any is
    /// written, so a rejected batch leaves the book unchanged.
    pub fn apply(&mut self, merged: &BTreeMap<usize, (f64, f64)>) -> SimResult<()> {
        let mut next = self.clone();
        for (&bus, &(p, q)) in merged {
            next.set(bus, p, q)?;
        }
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_command_wins() {
        let batch = [
            SetpointCommand::new(2, 10.0, 0.0),
            SetpointCommand::new(2, 20.0, 0.0),
            SetpointCommand::new(5, 3.0, 0.0),
        ];
        let merged = coalesce(&batch);
        assert_eq!(merged.len(), 2);

        let mut book = SetpointBook::new(6);
        book.set(1, -7.0, -1.0).unwrap();
        book.set(6, 4.0, 0.5).unwrap();
        book.apply(&merged).unwrap();

        assert_eq!(book.get(2), Some((20.0, 0.0)));
        assert_eq!(book.get(5), Some((3.0, 0.0)));
        // Untouched buses keep their earlier values
        assert_eq!(book.get(1), Some((-7.0, -1.0)));
        assert_eq!(book.get(3), Some((0.0, 0.0)));
        assert_eq!(book.get(6), Some((4.0, 0.5)));
    }

    #[test]
    fn rejected_batch_is_atomic() {
        let mut book = SetpointBook::new(2);
        let merged = coalesce(&[
            SetpointCommand::new(1, 100.0, 0.0),
            SetpointCommand::new(3, 5.0, 0.0),
        ]);
        assert!(book.apply(&merged).is_err());
        assert_eq!(book, SetpointBook::new(2));
    }

    #[test]
    fn slack_and_unknown_buses() {
        let mut book = SetpointBook::new(2);
        assert!(book.set(0, 1.0, 0.0).is_err());
        assert!(book.set(3, 1.0, 0.0).is_err());
        assert!(book.set(1, f64::INFINITY, 0.0).is_err());
        assert_eq!(book.get(0), None);
        assert_eq!(book.get(3), None);
    }
}
