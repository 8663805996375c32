//! The update loop: drain setpoints, solve, publish.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::{Duration, Instant};

use chrono::Utc;
use gf_core::timing::{AccumulatingTimer, Timer};
use gf_solver::{AdmittanceModel, GridState, LoadFlowSolution, LoadFlowSolver};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::setpoints::{SetpointBook, SetpointCommand, coalesce};
use crate::slack::SlackVoltageSource;
use crate::snapshot::{GridSnapshot, SnapshotCell};

/// Where the service is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Initializing,
    /// Waiting on the setpoint channel
    Idle,
    Solving,
    Publishing,
    Stopped,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    /// Re-solve after this long without messages; `None` blocks until one arrives
    pub idle_resolve_interval: Option<Duration>,
    /// Use the single-bus update when a batch touches one bus and the slack is unchanged
    pub incremental_updates: bool,
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Published(Arc<GridSnapshot>),
    /// Nothing changed since the last solve; no snapshot was published
    Unchanged,
}

/// Owns the solver and the setpoint book; the only writer of the snapshot cell.
pub struct UpdateService {
    model: Arc<AdmittanceModel>,
    solver: Box<dyn LoadFlowSolver>,
    slack: SlackVoltageSource,
    book: SetpointBook,
    cell: SnapshotCell,
    log_tx: Option<SyncSender<Arc<GridSnapshot>>>,
    options: ServiceOptions,
    state: ServiceState,
    cycle: u64,
    started: Instant,
    solve_time: AccumulatingTimer,
    diverged_cycles: u64,
}

impl UpdateService {
    /// Solve the initial operating point at `t = 0` and publish it as cycle 0.
    pub fn initialize(
        mut solver: Box<dyn LoadFlowSolver>,
        mut slack: SlackVoltageSource,
        book: SetpointBook,
        options: ServiceOptions,
    ) -> SimResult<Self> {
        let model = solver.model().clone();
        let pq = model.pq_bus_count();
        if book.pq_bus_count() != pq {
            return Err(SimError::InvalidSetpoint {
                what: format!(
                    "setpoint book covers {} buses, network has {pq} PQ buses",
                    book.pq_bus_count()
                ),
            });
        }

        let slack_voltage = slack.voltage_at(0.0);
        let timer = Timer::start("initial load flow");
        let solution = solver.solve(book.p(), book.q(), slack_voltage)?;
        let solve_ms = timer.elapsed_ms();
        let snapshot = snapshot_of(&model, solution, 0, 0.0, solve_ms);
        info!(
            algorithm = %solver.algorithm(),
            buses = snapshot.state.bus_count(),
            lines = snapshot.state.line_count(),
            slack = %slack_voltage,
            iterations = snapshot.iterations,
            solve_ms,
            "initial grid state solved"
        );

        let solve_time = AccumulatingTimer::new();
        solve_time.record(timer.elapsed());

        Ok(Self {
            model,
            solver,
            slack,
            book,
            cell: SnapshotCell::new(snapshot),
            log_tx: None,
            options,
            state: ServiceState::Initializing,
            cycle: 0,
            started: Instant::now(),
            solve_time,
            diverged_cycles: 0,
        })
    }

    /// Attach the bounded log hand-off. The current snapshot is offered immediately.
    pub fn with_log_sink(mut self, tx: SyncSender<Arc<GridSnapshot>>) -> Self {
        self.log_tx = Some(tx);
        self.offer_to_log(self.cell.load());
        self
    }

    /// A reader handle on the published snapshot.
    pub fn snapshots(&self) -> SnapshotCell {
        self.cell.clone()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn setpoints(&self) -> &SetpointBook {
        &self.book
    }

    pub fn diverged_cycles(&self) -> u64 {
        self.diverged_cycles
    }

    /// Apply one drained batch at simulation time `elapsed_s`, solve and publish.
    ///
    /// On failure the setpoint book and the published snapshot are left as
    /// they were before the call.
    pub fn run_cycle(
        &mut self,
        batch: &[SetpointCommand],
        elapsed_s: f64,
    ) -> SimResult<CycleOutcome> {
        let merged = coalesce(batch);
        let slack_voltage = self.slack.voltage_at(elapsed_s);
        let last = self.solver.solution().map(|s| s.slack_voltage);
        let slack_changed = last != Some(slack_voltage);

        if merged.is_empty() && !slack_changed {
            return Ok(CycleOutcome::Unchanged);
        }

        let previous = self.book.clone();
        self.book.apply(&merged)?;

        self.state = ServiceState::Solving;
        debug!(
            messages = batch.len(),
            buses = merged.len(),
            slack = %slack_voltage,
            elapsed_s,
            "solving"
        );
        let timer = Timer::start("load flow");
        let result = match merged.iter().next() {
            Some((&bus, &(p, q)))
                if self.options.incremental_updates && merged.len() == 1 && !slack_changed =>
            {
                self.solver.update_single_bus(bus, p, q)
            }
            _ => self
                .solver
                .solve(self.book.p(), self.book.q(), slack_voltage),
        };
        let solve_ms = timer.elapsed_ms();

        let solution = match result {
            Ok(solution) => solution,
            Err(e) => {
                self.book = previous;
                self.state = ServiceState::Idle;
                if e.is_divergence() {
                    self.diverged_cycles += 1;
                    warn!(
                        cycle = self.cycle + 1,
                        error = %e,
                        "load flow diverged; keeping previous snapshot"
                    );
                }
                return Err(e.into());
            }
        };

        self.state = ServiceState::Publishing;
        let snapshot = snapshot_of(&self.model, solution, self.cycle + 1, elapsed_s, solve_ms);
        self.solve_time.record(timer.elapsed());
        debug!(
            cycle = snapshot.cycle,
            iterations = snapshot.iterations,
            solve_ms,
            "load flow converged"
        );

        self.cycle += 1;
        let published = self.cell.publish(snapshot);
        self.offer_to_log(published.clone());
        self.state = ServiceState::Idle;
        Ok(CycleOutcome::Published(published))
    }

    /// Run until every setpoint sender is dropped.
    ///
    /// A cycle the solver rejects is abandoned and the loop keeps serving.
    pub fn run(mut self, rx: Receiver<SetpointCommand>) -> SimResult<()> {
        info!(
            idle_resolve_interval = ?self.options.idle_resolve_interval,
            incremental = self.options.incremental_updates,
            "update service running"
        );

        loop {
            self.state = ServiceState::Idle;
            let first = match self.options.idle_resolve_interval {
                None => match rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                },
                Some(interval) => match rx.recv_timeout(interval) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
            };

            let batch: Vec<SetpointCommand> = first.into_iter().chain(rx.try_iter()).collect();
            let elapsed_s = self.started.elapsed().as_secs_f64();
            match self.run_cycle(&batch, elapsed_s) {
                Ok(_) => {}
                // Divergence is already counted and logged by the cycle
                Err(SimError::Solver(e)) if e.is_divergence() => {}
                Err(SimError::Solver(e)) => {
                    warn!(error = %e, "load flow failed; keeping previous snapshot");
                }
                Err(SimError::InvalidSetpoint { what }) => {
                    warn!(%what, "dropping setpoint batch");
                }
                Err(e) => {
                    self.state = ServiceState::Stopped;
                    return Err(e);
                }
            }
        }

        self.state = ServiceState::Stopped;
        info!(
            cycles = self.cycle,
            diverged = self.diverged_cycles,
            solves = self.solve_time.count(),
            avg_solve_ms = self.solve_time.average().as_secs_f64() * 1e3,
            max_solve_ms = self.solve_time.max().as_secs_f64() * 1e3,
            "setpoint channel closed; update service stopped"
        );
        // Dropping the sender lets the log writer drain and exit
        self.log_tx = None;
        Ok(())
    }

    fn offer_to_log(&self, snapshot: Arc<GridSnapshot>) {
        let Some(tx) = &self.log_tx else {
            return;
        };
        match tx.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(s)) => {
                debug!(cycle = s.cycle, "log queue full; snapshot not logged");
            }
            Err(TrySendError::Disconnected(s)) => {
                debug!(cycle = s.cycle, "log writer gone; snapshot not logged");
            }
        }
    }
}

fn snapshot_of(
    model: &AdmittanceModel,
    solution: &LoadFlowSolution,
    cycle: u64,
    elapsed_s: f64,
    solve_ms: f64,
) -> GridSnapshot {
    GridSnapshot {
        state: GridState::from_solution(model, solution),
        cycle,
        elapsed_s,
        published_at: Utc::now(),
        slack_voltage: solution.slack_voltage,
        iterations: solution.iterations,
        solve_ms,
    }
}

