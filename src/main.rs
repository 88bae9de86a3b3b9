//! angle-exhaust CLI: plan, estimate, and simulate discovery runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use angle_exhaust::angle::{Angle, AngleResult, Discovery};
use angle_exhaust::config::EngineConfig;
use angle_exhaust::engine::{
    AngleExecutor, Checkpoint, DiscoveryEngine, DiscoveryRequest, DiscoveryState, RunReport,
};
use angle_exhaust::error::DiscoveryResult;
use angle_exhaust::failure::analyze_failure_patterns;
use angle_exhaust::knowledge::KnowledgeGraph;
use angle_exhaust::probability::{
    ProbabilityEstimator, ProblemProfile, angles_needed, breakthrough_probability,
};

#[derive(Parser)]
#[command(
    name = "angle-exhaust",
    version,
    about = "Probability-driven angle-exhaustion discovery engine"
)]
struct Cli {
    /// Engine config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the iteration ceiling from the config.
    #[arg(long, global = true)]
    max_iterations: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how many angles a per-angle probability needs.
    Plan {
        /// Per-angle success probability.
        #[arg(long)]
        p: f64,

        /// Target probability of at least one breakthrough.
        #[arg(long, default_value = "0.95")]
        target: f64,
    },

    /// Estimate per-angle probability from problem descriptors.
    Estimate {
        #[command(flatten)]
        profile: ProfileArgs,

        #[arg(long, default_value = "0.95")]
        target: f64,
    },

    /// Run the engine against a seeded random executor.
    Simulate {
        /// Problem statement.
        problem: String,

        #[arg(long, default_value = "0.95")]
        target: f64,

        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        sim: SimulationArgs,

        /// Where to write the checkpoint if the run is paused (Ctrl-C).
        #[arg(long, default_value = "angle-exhaust.checkpoint.json")]
        checkpoint: PathBuf,
    },

    /// Continue a paused simulation from its checkpoint file.
    Resume {
        #[arg(long, default_value = "angle-exhaust.checkpoint.json")]
        checkpoint: PathBuf,

        #[command(flatten)]
        sim: SimulationArgs,
    },
}

#[derive(clap::Args)]
struct ProfileArgs {
    /// well_studied, partially_explored, or completely_novel.
    #[arg(long, default_value = "partially_explored")]
    novelty: String,

    /// rich, moderate, or sparse.
    #[arg(long, default_value = "moderate")]
    data: String,

    /// highly_constrained, moderately_constrained, or wide_open.
    #[arg(long, default_value = "moderately_constrained")]
    constraints: String,

    /// many_failures, some_attempts, or fresh_problem.
    #[arg(long, default_value = "some_attempts")]
    prior: String,
}

impl ProfileArgs {
    fn profile(&self) -> ProblemProfile {
        ProblemProfile::from_labels(&self.novelty, &self.data, &self.constraints, &self.prior)
    }
}

#[derive(clap::Args)]
struct SimulationArgs {
    /// Chance that any single angle produces a signal.
    #[arg(long, default_value = "0.02")]
    signal_rate: f64,

    /// RNG seed for the simulated executor.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Discoveries required before the problem counts as solved.
    #[arg(long, default_value = "3")]
    solve_after: usize,

    /// Export the probability audit log as JSON.
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Print the full report as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

/// Executor that signals at a fixed rate with random strength.
struct SimulatedExecutor {
    rng: RefCell<StdRng>,
    signal_rate: f64,
}

impl AngleExecutor for SimulatedExecutor {
    fn execute(&self, angle: &Angle, _knowledge: &KnowledgeGraph) -> DiscoveryResult<AngleResult> {
        let started = Instant::now();
        let mut rng = self.rng.borrow_mut();
        let result = if rng.gen_bool(self.signal_rate) {
            let strength = rng.gen_range(0.1..=1.0);
            AngleResult::signal(angle.clone(), strength)
                .with_finding(format!("{} angle responded: {}", angle.category, angle.description))
        } else {
            AngleResult::no_signal(angle.clone())
        };
        Ok(result.with_duration_ms(started.elapsed().as_millis() as u64))
    }
}

fn build_engine(config: EngineConfig, sim: &SimulationArgs) -> Result<DiscoveryEngine> {
    if !(0.0..=1.0).contains(&sim.signal_rate) {
        miette::bail!("--signal-rate must be within [0, 1], got {}", sim.signal_rate);
    }
    let solve_after = sim.solve_after.max(1);
    let engine = DiscoveryEngine::new(config)
        .with_executor(SimulatedExecutor {
            rng: RefCell::new(StdRng::seed_from_u64(sim.seed)),
            signal_rate: sim.signal_rate,
        })
        .with_checker(move |_: &str, found: &[Discovery]| -> bool { found.len() >= solve_after });

    signal_hook::flag::register(signal_hook::consts::SIGINT, engine.pause_handle().flag())
        .into_diagnostic()?;
    Ok(engine)
}

fn finish(
    engine: &DiscoveryEngine,
    report: &RunReport,
    sim: &SimulationArgs,
    checkpoint_path: &Path,
) -> Result<()> {
    if report.state == DiscoveryState::Paused {
        if let Some(checkpoint) = engine.checkpoint() {
            checkpoint.save(checkpoint_path)?;
            println!(
                "Paused before iteration {}; checkpoint written to {}",
                checkpoint.iteration,
                checkpoint_path.display()
            );
        }
    }

    if let Some(path) = &sim.audit_log {
        std::fs::write(path, engine.audit_log_json()?).into_diagnostic()?;
        println!("Audit log ({} entries) written to {}", report.probability_logs.len(), path.display());
    }

    if sim.json {
        println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        return Ok(());
    }

    println!("{report}");
    let results: Vec<AngleResult> = report.knowledge.results().cloned().collect();
    let failures = analyze_failure_patterns(&results);
    println!(
        "Failure rate {:.1}%: {}",
        failures.failure_rate * 100.0,
        failures.recommendation
    );
    if let Some(worst) = failures.worst_performing_category {
        println!("  worst category: {worst}");
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(max_iterations) = cli.max_iterations {
        config.max_iterations = max_iterations;
        config.validate()?;
    }

    match cli.command {
        Commands::Plan { p, target } => {
            let n = angles_needed(p, target)?;
            println!("p = {p}, target = {target}");
            println!("  angles needed:          {n}");
            println!(
                "  P(breakthrough) at n:   {:.4}",
                breakthrough_probability(p, n)?
            );
            if n > 1 {
                println!(
                    "  P(breakthrough) at n/2: {:.4}",
                    breakthrough_probability(p, n / 2)?
                );
            }
        }

        Commands::Estimate { profile, target } => {
            let mut estimator = ProbabilityEstimator::new();
            let (p, log) = estimator.estimate(&profile.profile(), &BTreeMap::new(), 0);
            let n = angles_needed(p, target)?;
            println!("p = {p:.4} ({})", log.reasoning);
            println!("  angles needed for {target}: {n}");
            for (name, value) in &log.factors {
                println!("  {name}: {value:.4}");
            }
        }

        Commands::Simulate {
            problem,
            target,
            profile,
            sim,
            checkpoint,
        } => {
            let mut engine = build_engine(config, &sim)?;
            let request = DiscoveryRequest::new(problem)
                .with_target_confidence(target)
                .with_profile(profile.profile());
            let report = engine.run(request)?;
            finish(&engine, &report, &sim, &checkpoint)?;
        }

        Commands::Resume { checkpoint, sim } => {
            let saved = Checkpoint::load(&checkpoint)?;
            let mut engine = build_engine(config, &sim)?;
            let report = engine.resume(Some(saved))?;
            finish(&engine, &report, &sim, &checkpoint)?;
        }
    }

    Ok(())
}
