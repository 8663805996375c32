//! Turn a validated grid configuration into a running solver stack.

use std::sync::Arc;
use std::time::Duration;

use gf_network::{BaseQuantities, Network, NetworkBuilder};
use gf_project::{AlgorithmDef, GridConfig, SetpointDef};
use gf_sim::{ServiceOptions, SetpointBook, SlackVoltageSource, SlackVoltageTrace, UpdateService};
use gf_solver::{
    AdmittanceModel, Algorithm, Complex64, GridState, LoadFlowConfig, LoadFlowSolver, build_solver,
};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Everything built from a [`GridConfig`] once, before any solve.
#[derive(Debug)]
pub struct GridRuntime {
    pub network: Network,
    pub model: Arc<AdmittanceModel>,
    pub algorithm: Algorithm,
    pub load_flow: LoadFlowConfig,
    config: GridConfig,
}

pub fn algorithm_of(def: AlgorithmDef) -> Algorithm {
    match def {
        AlgorithmDef::CurrentInjection => Algorithm::CurrentInjection,
        AlgorithmDef::NewtonRaphson => Algorithm::NewtonRaphson,
    }
}

/// Build the network and admittance model described by `config`.
pub fn compile_grid(config: &GridConfig) -> AppResult<GridRuntime> {
    gf_project::validate_config(config)
        .map_err(|e| AppError::Configuration(e.to_string()))?;

    let mut builder = NetworkBuilder::new();
    if let Some(n) = config.bus_count {
        builder = builder.with_bus_count(n);
    }
    for line in &config.lines {
        builder.add_line(line.from, line.to, line.r, line.x, line.b);
    }
    let network = builder.build()?;

    let base = BaseQuantities::new(config.base_quantities.v, config.base_quantities.s)?;
    let model = Arc::new(AdmittanceModel::new(&network, base));
    let load_flow = LoadFlowConfig {
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        ..LoadFlowConfig::default()
    };
    load_flow.validate()?;

    info!(
        buses = network.bus_count(),
        lines = network.line_count(),
        algorithm = ?config.algorithm,
        "grid compiled"
    );

    Ok(GridRuntime {
        network,
        model,
        algorithm: algorithm_of(config.algorithm),
        load_flow,
        config: config.clone(),
    })
}

impl GridRuntime {
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn bus_count(&self) -> usize {
        self.model.bus_count()
    }

    pub fn solver(&self) -> AppResult<Box<dyn LoadFlowSolver>> {
        Ok(build_solver(self.algorithm, self.model.clone(), self.load_flow)?)
    }

    /// The configured slack source; a trace is read from disk here.
    pub fn slack_source(&self) -> AppResult<SlackVoltageSource> {
        let def = &self.config.slack_voltage;
        if def.use_trace {
            let path = def.trace_file_path.as_deref().ok_or_else(|| {
                AppError::Configuration("use_trace is set without trace_file_path".to_string())
            })?;
            let trace = SlackVoltageTrace::from_path(path)?;
            info!(path = %path.display(), samples = trace.len(), "slack voltage trace loaded");
            Ok(SlackVoltageSource::Trace(trace))
        } else {
            Ok(SlackVoltageSource::Constant(Complex64::new(
                def.voltage_real,
                def.voltage_imaginary,
            )))
        }
    }

    /// Setpoint book holding the configured initial setpoints, then `extra`.
    pub fn setpoint_book(&self, extra: &[SetpointDef]) -> AppResult<SetpointBook> {
        let mut book = SetpointBook::new(self.model.pq_bus_count());
        for sp in self.config.initial_setpoints.iter().chain(extra) {
            book.set(sp.bus_index, sp.p, sp.q)?;
        }
        Ok(book)
    }

    pub fn service_options(&self) -> AppResult<ServiceOptions> {
        let service = &self.config.service;
        let idle_resolve_interval = service
            .idle_resolve_interval_s
            .map(|s| {
                Duration::try_from_secs_f64(s).map_err(|e| {
                    AppError::Configuration(format!("idle_resolve_interval_s {s}: {e}"))
                })
            })
            .transpose()?;
        Ok(ServiceOptions {
            idle_resolve_interval,
            incremental_updates: service.incremental_updates,
        })
    }

    /// Solve the initial operating point and return the update service.
    pub fn start_service(&self) -> AppResult<UpdateService> {
        Ok(UpdateService::initialize(
            self.solver()?,
            self.slack_source()?,
            self.setpoint_book(&[])?,
            self.service_options()?,
        )?)
    }

    /// One load flow at `t = 0` with `extra` setpoints applied over the configured ones.
    pub fn solve_once(&self, extra: &[SetpointDef]) -> AppResult<GridState> {
        let book = self.setpoint_book(extra)?;
        let slack = self.slack_source()?.voltage_at(0.0);
        let mut solver = self.solver()?;
        let solution = solver.solve(book.p(), book.q(), slack)?;
        Ok(GridState::from_solution(&self.model, solution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_project::{BaseQuantitiesDef, LineDef, ServiceDef, SlackVoltageDef};

    fn three_bus() -> GridConfig {
        GridConfig {
            lines: vec![
                LineDef {
                    from: 0,
                    to: 1,
                    r: 0.05,
                    x: 0.02,
                    b: 0.0,
                },
                LineDef {
                    from: 1,
                    to: 2,
                    r: 0.05,
                    x: 0.02,
                    b: 0.0,
                },
            ],
            base_quantities: BaseQuantitiesDef { s: 100_000.0, v: 230.0 },
            algorithm: AlgorithmDef::CurrentInjection,
            tolerance: 1e-10,
            max_iterations: 100,
            bus_count: None,
            slack_voltage: SlackVoltageDef {
                use_trace: false,
                voltage_real: 230.0,
                voltage_imaginary: 0.0,
                trace_file_path: None,
            },
            initial_setpoints: vec![SetpointDef {
                bus_index: 1,
                p: -1000.0,
                q: 0.0,
            }],
            service: ServiceDef::default(),
        }
    }

    #[test]
    fn compiles_and_solves() {
        let runtime = compile_grid(&three_bus()).unwrap();
        assert_eq!(runtime.bus_count(), 3);

        let state = runtime
            .solve_once(&[SetpointDef {
                bus_index: 2,
                p: -2000.0,
                q: 0.0,
            }])
            .unwrap();
        assert_eq!(state.p[1], -1000.0);
        assert_eq!(state.p[2], -2000.0);
        assert!(state.vm[2] < state.vm[1]);
    }

    #[test]
    fn algorithm_mapping() {
        assert_eq!(algorithm_of(AlgorithmDef::NewtonRaphson), Algorithm::NewtonRaphson);
        assert_eq!(algorithm_of(AlgorithmDef::CurrentInjection), Algorithm::CurrentInjection);
    }

    #[test]
    fn disconnected_grid_is_a_configuration_error() {
        let mut config = three_bus();
        config.lines[1].from = 0;
        config.lines[1].to = 1;
        config.bus_count = Some(3);
        config.initial_setpoints.clear();
        assert!(compile_grid(&config).unwrap_err().is_configuration());
    }

    #[test]
    fn oversized_grid_is_a_configuration_error() {
        let mut config = three_bus();
        config.lines[1].to = usize::MAX;
        assert!(compile_grid(&config).unwrap_err().is_configuration());

        let mut config = three_bus();
        config.bus_count = Some(usize::MAX);
        assert!(compile_grid(&config).unwrap_err().is_configuration());
    }

    #[test]
    fn missing_trace_file_is_a_configuration_error() {
        let mut config = three_bus();
        config.slack_voltage.use_trace = true;
        config.slack_voltage.trace_file_path = Some("/nonexistent/trace.csv".into());
        let runtime = compile_grid(&config).unwrap();
        assert!(runtime.slack_source().unwrap_err().is_configuration());
    }

    #[test]
    fn service_starts_at_cycle_zero() {
        let runtime = compile_grid(&three_bus()).unwrap();
        let service = runtime.start_service().unwrap();
        assert_eq!(service.cycle(), 0);
        assert_eq!(service.snapshots().load().state.p[1], -1000.0);
    }
}
