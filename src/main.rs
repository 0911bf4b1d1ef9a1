//! Command-line run harness (C7): builds a synthetic overlay, seeds a
//! Push-Sum run on it, drives the faulty simulator to quiescence (or the
//! configured horizon), and reports the result.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::{info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::Serialize;

use pushsum_sim::config::{ConfigLoadError, GraphType, SimulationConfig};
use pushsum_sim::graphgen;
use pushsum_sim::message::{GossipKind, Message, MessageId};
use pushsum_sim::node::PushSumNode;
use pushsum_sim::node_id::NodeId;
use pushsum_sim::simulator::{EventOutcome, Simulator};
use pushsum_sim::topology::Topology;

#[derive(Parser)]
#[command(name = "pushsum-sim", about = "Push-Sum gossip aggregation over a synthetic faulty overlay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a topology, seed a Push-Sum run, and report convergence.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Load base settings from a TOML config file; CLI flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    graph_type: Option<CliGraphType>,
    #[arg(long)]
    vertices: Option<usize>,
    #[arg(long)]
    initial_value: Option<f64>,
    #[arg(long)]
    fanout: Option<usize>,
    #[arg(long)]
    no_news: Option<usize>,
    #[arg(long)]
    fault_chance: Option<f64>,
    #[arg(long)]
    horizon_ms: Option<u64>,
    #[arg(long)]
    edge_distance: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent replicas to run, each with a distinct derived
    /// seed, in parallel.
    #[arg(long, default_value_t = 1)]
    replicas: u32,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[derive(Copy, Clone, ValueEnum)]
enum CliGraphType {
    ErdosRenyi,
    BarabasiAlbert,
    WattsStrogatz,
    RandomGeometric,
}

impl From<CliGraphType> for GraphType {
    fn from(value: CliGraphType) -> Self {
        match value {
            CliGraphType::ErdosRenyi => GraphType::ErdosRenyi,
            CliGraphType::BarabasiAlbert => GraphType::BarabasiAlbert,
            CliGraphType::WattsStrogatz => GraphType::WattsStrogatz,
            CliGraphType::RandomGeometric => GraphType::RandomGeometric,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn default_config() -> SimulationConfig {
    toml::from_str(
        r#"
            graph-type = "erdos-renyi"
            vertices = 10
            initial-value = 10.0
            fanout = 3
            no-news = 5
            fault-chance = 0.05
            horizon-ms = 60000
        "#,
    )
    .expect("built-in default config is well-formed")
}

fn resolve_config(args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path).map_err(config_load_error)?,
        None => default_config(),
    };

    if let Some(g) = args.graph_type {
        config.graph_type = g.into();
    }
    if let Some(v) = args.vertices {
        config.vertices = v;
    }
    if let Some(v) = args.initial_value {
        config.initial_value = v;
    }
    if let Some(v) = args.fanout {
        config.fanout = v;
    }
    if let Some(v) = args.no_news {
        config.no_news = v;
    }
    if let Some(v) = args.fault_chance {
        config.fault_chance = v;
    }
    if let Some(v) = args.horizon_ms {
        config.horizon_ms = v;
    }
    if let Some(v) = args.edge_distance {
        config.edge_distance = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }

    config.validate().map_err(config_load_error)?;
    Ok(config)
}

fn config_load_error(err: ConfigLoadError) -> anyhow::Error {
    anyhow::anyhow!(err.to_string())
}

#[derive(Serialize)]
struct RunReport {
    completed_at: DateTime<Utc>,
    seed: u64,
    vertices: usize,
    delivered: u64,
    lost: u64,
    invalid: u64,
    current_instant: u64,
    horizon_reached: bool,
    quiescent: bool,
    max_round: u32,
    aggregate_mean: f64,
    aggregate_spread: f64,
}

fn build_topology(config: &SimulationConfig, rng: &mut StdRng) -> Result<Topology> {
    let edges = match config.graph_type {
        GraphType::ErdosRenyi => graphgen::erdos_renyi(config.vertices, rng),
        GraphType::BarabasiAlbert => graphgen::barabasi_albert(config.vertices, rng),
        GraphType::WattsStrogatz => graphgen::watts_strogatz(config.vertices, config.nearest_neighbors, config.rewiring_probability, rng),
        GraphType::RandomGeometric => {
            anyhow::bail!("random-geometric graph generation is not implemented");
        }
    };
    Ok(Topology::from_edges(edges.into_iter().map(|(a, b)| (a, b, config.edge_distance))))
}

fn run_once(config: &SimulationConfig, seed: u64) -> Result<RunReport> {
    let mut topo_rng = StdRng::seed_from_u64(seed);
    let topology = build_topology(config, &mut topo_rng).context("building topology")?;

    let mut nodes: HashMap<NodeId, PushSumNode> = HashMap::new();
    for v in 0..config.vertices {
        let id = NodeId::new(v as u32);
        let neighbors = topology.neighbors_of(id).to_vec();
        let node_seed = seed.wrapping_add(v as u64).wrapping_mul(2_654_435_761);
        nodes.insert(id, PushSumNode::new(id, neighbors, config.initial_value, config.fanout, config.no_news, node_seed));
    }

    let mut sim = Simulator::new(nodes, topology, config.fault_chance, config.horizon_ms, seed);
    let seed_node = NodeId::new(0);
    let seed_msg = Message::gossip(MessageId { origin: seed_node, seq: 0 }, GossipKind::Request, 0, 0.0, 0.0);
    sim.start(seed_node, seed_msg);

    if sim.horizon_reached() {
        warn!("run with seed {seed} hit the horizon before reaching quiescence");
    }

    let mut delivered = 0u64;
    let mut lost = 0u64;
    let mut invalid = 0u64;
    for record in sim.history() {
        match record.outcome {
            EventOutcome::Delivered => delivered += 1,
            EventOutcome::Lost => lost += 1,
            EventOutcome::Invalid => invalid += 1,
        }
    }

    let aggregates: Vec<f64> = sim.nodes().values().map(|n| n.aggregate()).collect();
    let max_round = sim.nodes().values().map(|n| n.round()).max().unwrap_or(0);
    let mean = aggregates.iter().sum::<f64>() / aggregates.len().max(1) as f64;
    let spread = aggregates.iter().fold(0.0_f64, |acc, &a| acc.max((a - mean).abs()));

    Ok(RunReport {
        completed_at: Utc::now(),
        seed,
        vertices: config.vertices,
        delivered,
        lost,
        invalid,
        current_instant: sim.current_instant(),
        horizon_reached: sim.horizon_reached(),
        quiescent: sim.is_quiescent(),
        max_round,
        aggregate_mean: mean,
        aggregate_spread: spread,
    })
}

fn print_report(report: &RunReport, format: ReportFormat) {
    match format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).expect("report serializes"));
        }
        ReportFormat::Text => {
            println!("[{}] seed={} vertices={}", report.completed_at.to_rfc3339(), report.seed, report.vertices);
            println!("  delivered={} lost={} invalid={}", report.delivered, report.lost, report.invalid);
            println!("  current_instant={} horizon_reached={} quiescent={}", report.current_instant, report.horizon_reached, report.quiescent);
            println!("  max_round={} aggregate_mean={:.6} aggregate_spread={:.6}", report.max_round, report.aggregate_mean, report.aggregate_spread);
        }
    }
}

fn init_logging() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("pushsum_sim"), LevelFilter::Debug)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let format = args.format;
            let replicas = args.replicas.max(1);
            let config = resolve_config(&args)?;

            info!("starting {replicas} replica(s) of a {}-vertex {} run", config.vertices, config.graph_type);

            let mut base_rng = StdRng::seed_from_u64(config.seed);
            let seeds: Vec<u64> = (0..replicas).map(|_| base_rng.gen()).collect();

            let reports: Vec<Result<RunReport>> = if replicas == 1 {
                vec![run_once(&config, seeds[0])]
            } else {
                let config_ref = &config;
                std::thread::scope(|scope| {
                    let handles: Vec<_> = seeds
                        .iter()
                        .map(|&seed| scope.spawn(move || run_once(config_ref, seed)))
                        .collect();
                    handles.into_iter().map(|h| h.join().expect("replica thread panicked")).collect()
                })
            };

            for result in reports {
                let report = result?;
                print_report(&report, format);
            }
            Ok(())
        }
    }
}
