//! Background log writer fed by the bounded snapshot hand-off.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use gf_sim::GridSnapshot;
use tracing::{error, info};

use crate::store::SnapshotLog;

/// Drain `rx` into `log` on a dedicated thread until every sender is gone.
///
/// Write failures are reported and the snapshot skipped; the thread returns
/// the number of snapshots written.
pub fn spawn_log_writer(
    mut log: SnapshotLog,
    rx: Receiver<Arc<GridSnapshot>>,
) -> std::io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("grid-log-writer".to_string())
        .spawn(move || {
            for snapshot in rx {
                if let Err(e) = log.append(&snapshot) {
                    error!(cycle = snapshot.cycle, error = %e, "failed to log snapshot");
                }
            }
            info!(
                dir = %log.dir().display(),
                written = log.written(),
                "log writer stopped"
            );
            log.written()
        })
}
