use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use gf_app::{AppError, AppResult, GridClient, ServerOptions, StateReply, compile_grid, serve};
use gf_project::SetpointDef;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gf-cli")]
#[command(about = "GridFlow CLI - real-time distribution grid load flow service", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the grid service
    Serve {
        /// Path to the grid configuration (YAML or JSON)
        config: PathBuf,
        /// Directory for the bus and line CSV logs
        log_path: PathBuf,
        /// Address to bind
        ip: IpAddr,
        port: u16,
    },
    /// Validate a configuration file
    Validate {
        config: PathBuf,
    },
    /// Solve once at t = 0 and print the state as JSON
    Solve {
        config: PathBuf,
        /// Extra setpoint as BUS:P:Q (W, var; generation positive)
        #[arg(long = "setpoint", value_parser = parse_setpoint)]
        setpoints: Vec<SetpointDef>,
    },
    /// Ask a running service for its state
    Request {
        addr: SocketAddr,
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
    /// Send one setpoint to a running service
    Setpoint {
        addr: SocketAddr,
        bus: usize,
        #[arg(allow_hyphen_values = true)]
        p: f64,
        #[arg(allow_hyphen_values = true)]
        q: f64,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Serve {
            config,
            log_path,
            ip,
            port,
        } => cmd_serve(&config, log_path, SocketAddr::new(ip, port)),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Solve { config, setpoints } => cmd_solve(&config, &setpoints),
        Commands::Request { addr, timeout_ms } => {
            cmd_request(addr, Duration::from_millis(timeout_ms))
        }
        Commands::Setpoint { addr, bus, p, q } => cmd_setpoint(addr, bus, p, q),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_setpoint(s: &str) -> Result<SetpointDef, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [bus, p, q] = parts.as_slice() else {
        return Err(format!("expected BUS:P:Q, got '{s}'"));
    };
    Ok(SetpointDef {
        bus_index: bus.trim().parse().map_err(|e| format!("bus '{bus}': {e}"))?,
        p: p.trim().parse().map_err(|e| format!("P '{p}': {e}"))?,
        q: q.trim().parse().map_err(|e| format!("Q '{q}': {e}"))?,
    })
}

fn cmd_serve(config: &Path, log_dir: PathBuf, bind: SocketAddr) -> AppResult<()> {
    let project = gf_project::load_config(config)?;
    let runtime = compile_grid(&project.grid)?;
    let server = serve(
        &runtime,
        &ServerOptions {
            bind,
            log_dir: Some(log_dir),
        },
    )?;
    println!("Serving {} buses on {}", runtime.bus_count(), server.local_addr());
    let summary = server.wait()?;
    println!(
        "Stopped: {} requests, {} setpoints, {} dropped",
        summary.intake.requests, summary.intake.setpoints, summary.intake.dropped
    );
    Ok(())
}

fn cmd_validate(config: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config.display());
    let project = gf_project::load_config(config)?;
    let runtime = compile_grid(&project.grid)?;
    println!(
        "✓ Configuration is valid ({} buses, {} lines, {})",
        runtime.bus_count(),
        runtime.network.line_count(),
        runtime.algorithm
    );
    Ok(())
}

fn cmd_solve(config: &Path, setpoints: &[SetpointDef]) -> AppResult<()> {
    let project = gf_project::load_config(config)?;
    let runtime = compile_grid(&project.grid)?;
    let state = runtime.solve_once(setpoints)?;
    print_state(&StateReply::from(&state))
}

fn cmd_request(addr: SocketAddr, timeout: Duration) -> AppResult<()> {
    let mut client = GridClient::connect(addr)?;
    let state = client.get_state(timeout)?;
    print_state(&state)
}

fn cmd_setpoint(addr: SocketAddr, bus: usize, p: f64, q: f64) -> AppResult<()> {
    if !(p.is_finite() && q.is_finite()) {
        return Err(AppError::InvalidInput(format!("non-finite setpoint P={p} Q={q}")));
    }
    GridClient::connect(addr)?.implement_setpoint(bus, p, q)?;
    println!("Sent setpoint bus {bus}: P={p} W, Q={q} var");
    Ok(())
}

fn print_state(state: &StateReply) -> AppResult<()> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    println!("{json}");
    Ok(())
}
