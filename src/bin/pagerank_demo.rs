//! PageRank Demo
//!
//! Builds a deterministic directed graph (a ring where every vertex also
//! links `skip` positions ahead), runs PageRank on it and prints the
//! highest-ranked vertices.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 1000 vertices, base rank 0.15, one worker per CPU
//! cargo run --bin pagerank-demo
//!
//! # Smaller graph, 4 workers, top 5
//! cargo run --bin pagerank-demo -- --vertices 200 --workers 4 --top 5
//!
//! # Full report as JSON
//! cargo run --bin pagerank-demo -- --json > report.json
//! ```

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use signal_collect::vertices::pagerank;
use signal_collect::{
    EngineConfig, ExecutionReport, Graph, PageRankVertex, Scheduler, TerminationReason,
};

/// PageRank Demo CLI
#[derive(Parser, Debug)]
#[command(name = "pagerank-demo")]
#[command(about = "Run PageRank on a generated graph with the signal/collect engine")]
#[command(version)]
struct Args {
    /// Number of vertices
    #[arg(short = 'n', long, default_value_t = 1000)]
    vertices: usize,

    /// Every vertex also links this many positions ahead
    #[arg(long, default_value_t = 7)]
    skip: usize,

    /// Rank of a vertex without incoming links
    #[arg(short, long, default_value_t = 0.15)]
    base_rank: f64,

    /// Worker partitions per phase (overrides the config file)
    #[arg(short, long, env = "SIGNAL_COLLECT_WORKERS")]
    workers: Option<usize>,

    /// Convergence threshold (overrides the config file)
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Round budget (overrides the config file)
    #[arg(short, long)]
    max_rounds: Option<usize>,

    /// JSON engine config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of top-ranked vertices to print
    #[arg(short, long, default_value_t = 10)]
    top: usize,

    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

// =============================================================================
// Setup
// =============================================================================

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load engine config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(workers) = args.workers {
        config = config.with_parallelism(workers);
    }
    if let Some(epsilon) = args.epsilon {
        config = config.with_convergence_epsilon(epsilon);
    }
    if let Some(max_rounds) = args.max_rounds {
        config = config.with_max_rounds(max_rounds);
    }

    config.validate()?;
    Ok(config)
}

/// Ring of `n` vertices plus a link `skip` positions ahead of each vertex
fn build_graph(n: usize, skip: usize, base_rank: f64) -> Result<Graph<f64, f64>> {
    ensure!(n > 0, "graph needs at least one vertex");
    ensure!(
        (0.0..=1.0).contains(&base_rank),
        "base rank must lie in [0, 1], got {}",
        base_rank
    );

    let mut graph = Graph::new();
    for i in 0..n {
        graph.add_vertex(PageRankVertex::new(i as u64, base_rank).boxed())?;
    }

    for i in 0..n {
        let mut targets = vec![(i + 1) % n];
        let far = (i + skip) % n;
        if far != i && !targets.contains(&far) {
            targets.push(far);
        }
        let out_degree = targets.len();
        for target in targets {
            graph.add_edge(pagerank::link(i as u64, target as u64, out_degree)?)?;
        }
    }

    Ok(graph)
}

// =============================================================================
// Output Formatting
// =============================================================================

fn print_header(args: &Args, config: &EngineConfig, edges: usize) {
    let separator = "━".repeat(60);

    println!();
    println!("{}", separator.cyan());
    println!("{}", "Signal/Collect PageRank Demo".cyan().bold());
    println!("{}", separator.cyan());
    println!();

    println!("{}", "Configuration:".white().bold());
    println!("   ├─ Vertices: {}", args.vertices.to_string().green());
    println!("   ├─ Edges: {}", edges.to_string().green());
    println!("   ├─ Base rank: {}", args.base_rank);
    println!("   ├─ Workers: {}", config.parallelism);
    println!("   ├─ Epsilon: {:e}", config.convergence_epsilon);
    println!("   └─ Max rounds: {}", config.max_rounds);
    println!();
}

fn print_summary(report: &ExecutionReport<f64>, top: usize) {
    let reason = format!("{:?}", report.reason);
    let reason = match report.reason {
        TerminationReason::Converged => reason.green().bold(),
        TerminationReason::Cancelled => reason.yellow().bold(),
        TerminationReason::BudgetExhausted | TerminationReason::TimeLimitReached => {
            reason.red().bold()
        }
    };

    println!("{}", "Result:".white().bold());
    println!("   ├─ Termination: {}", reason);
    println!("   ├─ Rounds: {}", report.rounds);
    println!("   ├─ Final delta: {:e}", report.final_delta);
    println!("   ├─ Collect operations: {}", report.stats.collect_operations);
    println!("   ├─ Signals computed: {}", report.stats.signal_operations);
    println!("   ├─ Signals delivered: {}", report.stats.signals_delivered);
    println!("   └─ Duration: {:.2}ms", report.duration.as_secs_f64() * 1000.0);
    println!();

    let mut ranked: Vec<_> = report.states.iter().collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)));

    println!("{}", format!("Top {} ranks:", top.min(ranked.len())).white().bold());
    for (position, (id, rank)) in ranked.into_iter().take(top).enumerate() {
        println!(
            "   {:>3}. {:<12} {}",
            position + 1,
            id.to_string().cyan(),
            format!("{:.6}", rank).green()
        );
    }
    println!();

    if !report.is_converged() {
        println!("{}", "Tip:".yellow().bold());
        println!("   Raise --max-rounds or --epsilon to let the ranks settle.");
        println!();
    }
}

// =============================================================================
// Demo Runner
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = load_config(&args)?;
    let mut graph = build_graph(args.vertices, args.skip, args.base_rank)?;

    if !args.json {
        print_header(&args, &config, graph.edge_count());
    }

    let scheduler = Scheduler::new(config);

    // Ctrl-C finishes the current round and reports what we have
    let handle = scheduler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current round");
            handle.request_stop();
        }
    });

    let report = scheduler
        .run(&mut graph)
        .await
        .context("PageRank run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, args.top);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["pagerank-demo"]);
        assert_eq!(args.vertices, 1000);
        assert_eq!(args.skip, 7);
        assert_eq!(args.top, 10);
        assert!(!args.json);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_overrides_reach_config() {
        let args = Args::parse_from([
            "pagerank-demo",
            "--workers",
            "3",
            "--epsilon",
            "0.001",
            "--max-rounds",
            "12",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.convergence_epsilon, 0.001);
        assert_eq!(config.max_rounds, 12);
    }

    #[test]
    fn test_build_graph_shape() {
        let graph = build_graph(10, 3, 0.15).unwrap();
        assert_eq!(graph.vertex_count(), 10);
        assert_eq!(graph.edge_count(), 20);

        // skip == 1 coincides with the ring link
        let graph = build_graph(10, 1, 0.15).unwrap();
        assert_eq!(graph.edge_count(), 10);
    }

    #[test]
    fn test_build_graph_rejects_bad_input() {
        assert!(build_graph(0, 3, 0.15).is_err());
        assert!(build_graph(5, 3, 1.5).is_err());
    }
}
