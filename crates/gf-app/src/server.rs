//! UDP front end: intake thread, update thread and log writer.
//!
//! The intake thread owns the socket. Requests are answered from the
//! published snapshot; setpoints are checked and forwarded to the update
//! thread over an unbounded channel. The update thread hands every
//! published snapshot to the log writer through a bounded queue and never
//! waits on it.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gf_results::{SnapshotLog, spawn_log_writer};
use gf_sim::{SetpointCommand, SimResult, SnapshotCell};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::protocol::{MAX_DATAGRAM, Message, decode_message};
use crate::query::QueryResponder;
use crate::runtime::GridRuntime;

/// How often the intake wakes up to check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub bind: SocketAddr,
    /// Directory for the CSV log; `None` disables logging
    pub log_dir: Option<PathBuf>,
}

/// Counters kept by the intake thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    pub requests: u64,
    pub setpoints: u64,
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSummary {
    pub intake: IntakeStats,
    /// Snapshots written to the log, if logging was enabled
    pub logged: Option<u64>,
}

/// A running server. Dropping it without [`RunningServer::shutdown`]
/// leaves the threads running until the process exits.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    snapshots: SnapshotCell,
    intake: JoinHandle<AppResult<IntakeStats>>,
    update: JoinHandle<SimResult<()>>,
    logger: Option<JoinHandle<u64>>,
}

/// Start serving `runtime`: solve the initial state, then spawn the threads.
pub fn serve(runtime: &GridRuntime, options: &ServerOptions) -> AppResult<RunningServer> {
    let mut service = runtime.start_service()?;
    let snapshots = service.snapshots();

    let logger = match &options.log_dir {
        Some(dir) => {
            let log = SnapshotLog::create(dir)?;
            let capacity = runtime.config().service.log_queue_capacity;
            let (log_tx, log_rx) = mpsc::sync_channel(capacity);
            service = service.with_log_sink(log_tx);
            info!(dir = %dir.display(), capacity, "logging snapshots");
            Some(spawn_log_writer(log, log_rx)?)
        }
        None => None,
    };

    let socket = UdpSocket::bind(options.bind)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    let local_addr = socket.local_addr()?;

    let (tx, rx) = mpsc::channel();
    let update = thread::Builder::new()
        .name("grid-update".to_string())
        .spawn(move || service.run(rx))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let intake = Intake {
        socket,
        responder: QueryResponder::new(snapshots.clone()),
        setpoints: tx,
        bus_count: runtime.bus_count(),
        shutdown: shutdown.clone(),
        stats: IntakeStats::default(),
    };
    let intake = thread::Builder::new()
        .name("grid-intake".to_string())
        .spawn(move || intake.run())?;

    info!(%local_addr, buses = runtime.bus_count(), "grid server listening");
    Ok(RunningServer {
        local_addr,
        shutdown,
        snapshots,
        intake,
        update,
        logger,
    })
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn snapshots(&self) -> &SnapshotCell {
        &self.snapshots
    }

    /// Flag that stops the intake on its next poll.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Block until the intake stops, then drain the other threads.
    pub fn wait(self) -> AppResult<ServerSummary> {
        let intake = join(self.intake, "intake")?;
        // The intake dropped the setpoint sender, so the update loop ends
        // and releases the log queue in turn.
        let update = join(self.update, "update")?;
        let logged = self.logger.map(|h| join(h, "log writer")).transpose()?;
        update?;
        let intake = intake?;
        info!(?intake, ?logged, "grid server stopped");
        Ok(ServerSummary { intake, logged })
    }

    /// Stop accepting datagrams and wait for every thread to finish.
    pub fn shutdown(self) -> AppResult<ServerSummary> {
        self.shutdown.store(true, Ordering::Relaxed);
        self.wait()
    }
}

fn join<T>(handle: JoinHandle<T>, name: &str) -> AppResult<T> {
    handle
        .join()
        .map_err(|_| AppError::Simulation(format!("{name} thread panicked")))
}

struct Intake {
    socket: UdpSocket,
    responder: QueryResponder,
    setpoints: Sender<SetpointCommand>,
    bus_count: usize,
    shutdown: Arc<AtomicBool>,
    stats: IntakeStats,
}

impl Intake {
    fn run(mut self) -> AppResult<IntakeStats> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        while !self.shutdown.load(Ordering::Relaxed) {
            let (len, peer) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                // ICMP port-unreachable from an earlier reply surfaces here on some platforms
                Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e.into()),
            };

            match self.handle(&buf[..len], peer) {
                Ok(()) => {}
                Err(AppError::Transport(what)) => {
                    self.stats.dropped += 1;
                    warn!(%peer, %what, "dropping datagram");
                }
                Err(e) => return Err(e),
            }
        }
        debug!(stats = ?self.stats, "intake stopped");
        Ok(self.stats)
    }

    fn handle(&mut self, datagram: &[u8], peer: SocketAddr) -> AppResult<()> {
        match decode_message(datagram)? {
            Message::Request => {
                let reply = self.responder.reply()?;
                if let Err(e) = self.socket.send_to(&reply, peer) {
                    warn!(%peer, error = %e, "failed to send state reply");
                }
                self.stats.requests += 1;
            }
            Message::ImplementSetpoint { bus_index, p, q } => {
                self.check_setpoint(bus_index, p, q)?;
                self.setpoints
                    .send(SetpointCommand::new(bus_index, p, q))
                    .map_err(|_| AppError::Simulation("update thread has stopped".to_string()))?;
                self.stats.setpoints += 1;
                debug!(bus_index, p, q, "setpoint queued");
            }
        }
        Ok(())
    }

    fn check_setpoint(&self, bus_index: usize, p: f64, q: f64) -> AppResult<()> {
        if bus_index == 0 || bus_index >= self.bus_count {
            return Err(AppError::Transport(format!(
                "bus_index {bus_index} is not a PQ bus (valid: 1..={})",
                self.bus_count - 1
            )));
        }
        if !(p.is_finite() && q.is_finite()) {
            return Err(AppError::Transport(format!(
                "non-finite setpoint for bus {bus_index}"
            )));
        }
        Ok(())
    }
}
