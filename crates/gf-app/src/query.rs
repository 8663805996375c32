//! Read side of the service: answers state requests from the published snapshot.

use std::sync::Arc;

use gf_sim::{GridSnapshot, SnapshotCell};

use crate::error::AppResult;
use crate::protocol::{StateReply, encode};

/// Answers requests without touching the solver.
#[derive(Debug, Clone)]
pub struct QueryResponder {
    cell: SnapshotCell,
}

impl QueryResponder {
    pub fn new(cell: SnapshotCell) -> Self {
        Self { cell }
    }

    pub fn snapshot(&self) -> Arc<GridSnapshot> {
        self.cell.load()
    }

    pub fn state(&self) -> StateReply {
        StateReply::from(&self.cell.load().state)
    }

    /// Encoded reply datagram.
    pub fn reply(&self) -> AppResult<Vec<u8>> {
        encode(&self.state())
    }
}
