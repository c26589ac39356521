// src/bin/bias-graph.rs
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bias_graph::export;
use bias_graph::ingest;
use bias_graph::ranking;
use bias_graph::{EngineConfig, FileTraceSink, NoopSink, Result, TraceSink};

#[derive(Parser)]
#[command(name = "bias-graph")]
#[command(about = "Propagate ideological bias through a follow graph and list its strongly connected components")]
struct Cli {
    /// Users file (header row; name, tweets, years or created_at columns)
    #[arg(long)]
    users: PathBuf,

    /// Connections file (header row; followee;follower pairs)
    #[arg(long)]
    connections: PathBuf,

    /// JSON engine configuration (seeds, refinement, top_k, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving biases.txt, components.txt and report.json
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Append-only log of bias computation and removed edges
    #[arg(long)]
    trace_log: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bias_graph=info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&Cli::parse()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };

    let trace: Arc<dyn TraceSink> = match &cli.trace_log {
        Some(path) => Arc::new(FileTraceSink::create(path)?),
        None => Arc::new(NoopSink),
    };

    let baseline = peak_resident_kb();
    let timer = Instant::now();
    let mut graph = ingest::load_graph(&cli.users, &cli.connections, &config, trace)?;
    println!("Graph loaded in {:.6} [sec]", timer.elapsed().as_secs_f64());
    if let (Some(before), Some(after)) = (baseline, peak_resident_kb()) {
        println!("Resident memory used: {} [KB]", after.saturating_sub(before));
    }
    println!();

    std::fs::create_dir_all(&cli.out_dir)?;

    // Bias
    let timer = Instant::now();
    let summary = graph.compute_bias_with(&config.seed_names(), config.refinement.as_ref());
    println!("BIAS computed in {:.6} [sec]", timer.elapsed().as_secs_f64());
    with_output(&cli.out_dir.join("biases.txt"), |out| export::write_bias_table(graph.users(), out))?;

    // Components
    let timer = Instant::now();
    let components = graph.strongly_connected_components();
    println!("SCCs computed in {:.6} [sec]", timer.elapsed().as_secs_f64());
    with_output(&cli.out_dir.join("components.txt"), |out| export::write_components(&components, out))?;

    with_output(&cli.out_dir.join("report.json"), |out| {
        export::write_json_report(&graph, Some(&summary), out)
    })?;

    // Rankings
    let timer = Instant::now();
    let influential = ranking::top_influential(graph.users(), config.top_k);
    let influenceable = ranking::top_influenceable(graph.users(), config.top_k);
    println!("TOP computed in {:.6} [sec]", timer.elapsed().as_secs_f64());

    println!();
    println!("TOP INFLUENTIAL:");
    println!();
    for (rank, user) in influential.iter().enumerate() {
        println!("[{}] {}: {}", rank + 1, user.name, user.follower_count);
    }

    println!();
    println!("TOP INFLUENCEABLE:");
    println!();
    for (rank, user) in influenceable.iter().enumerate() {
        println!("[{}] {}: {}", rank + 1, user.name, user.followee_count);
    }

    Ok(())
}

fn with_output<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let mut out = BufWriter::new(File::create(path)?);
    write(&mut out)?;
    out.flush()?;
    Ok(())
}

/// Peak resident set size in KB (Linux only).
fn peak_resident_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
}
