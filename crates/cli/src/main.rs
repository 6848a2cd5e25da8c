//! RVV backend simulator CLI.
//!
//! Single entry point: load a JSON program, run it to completion (or the
//! cycle budget), print statistics, and optionally write the trace log.

use std::fs::File;
use std::io::BufWriter;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vexsim_core::sim::{Simulator, load_program};
use vexsim_core::trace::Tracer;

#[derive(Parser, Debug)]
#[command(
    name = "vexsim",
    version,
    about = "Event-driven cycle-approximate RVV backend simulator",
    long_about = "Run a JSON program description through the vector backend.\n\nExamples:\n  vexsim --program demos/vadd.json\n  vexsim --program demos/vadd.json --trace --verbose"
)]
struct Cli {
    /// Program description file (JSON).
    #[arg(short, long)]
    program: String,

    /// Record the simulation trace log.
    #[arg(long)]
    trace: bool,

    /// Verbose diagnostic logging.
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(&cli.program)?;
    let sim_config = program.config.simulation_config.clone();

    let tracing_enabled = cli.trace || sim_config.enable_tracing;
    let tracer = if tracing_enabled {
        Tracer::enabled()
    } else {
        Tracer::disabled()
    };

    let name = if program.name.is_empty() {
        cli.program.clone()
    } else {
        program.name.clone()
    };
    tracing::debug!(program = %name, "starting simulation");

    let mut sim = Simulator::new(program, tracer.clone());
    let stats = sim.run();

    println!("program: {name}");
    print!("{}", stats.report());
    if cli.verbose {
        println!("vrf: {}", sim.vrf_dump());
    }

    if tracing_enabled {
        let path = sim_config
            .trace_output
            .unwrap_or_else(|| "trace.log".to_owned());
        let mut out = BufWriter::new(File::create(&path)?);
        tracer.write_to(&mut out)?;
        println!("trace written to {path}");
    }

    Ok(())
}
