//! CLI command definitions for multiturn-harness.
//!
//! `run` drives one conversation from a YAML run file, `skills` previews a
//! skills directory and `show` summarises a stored trajectory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{build_llm_provider, RunSpec};
use crate::conversation::ConversationOrchestrator;
use crate::skills::{discover_skills, install_skills, SkillFilter};
use crate::trajectory::{load_file, Trajectory, TrajectoryStorage};

/// Multi-turn conversation harness for evaluating agents against a simulated user.
#[derive(Parser)]
#[command(name = "multiturn-harness")]
#[command(about = "Run multi-turn conversations between a simulated user and an agent")]
#[command(version)]
#[command(
    long_about = "multiturn-harness alternates between a simulated user and an inner agent until the user is done, \
the turn limit is hit or an actor fails, and records the full trajectory.\n\nExample usage:\n  \
multiturn-harness run --config run.yaml --max-turns 10 --output ./trajectories"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run one conversation described by a YAML file.
    Run(RunArgs),

    /// List the skills a directory and filter would install.
    Skills(SkillsArgs),

    /// Summarise a stored trajectory file.
    Show(ShowArgs),
}

/// Arguments for `multiturn-harness run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the YAML run file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the turn limit from the run file.
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Override the output directory from the run file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Default model for LLM-backed actors.
    #[arg(short, long, env = "LITELLM_DEFAULT_MODEL")]
    pub model: Option<String>,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY or LITELLM_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY")]
    pub api_key: Option<String>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `multiturn-harness skills`.
#[derive(Parser, Debug)]
pub struct SkillsArgs {
    /// Directory containing skill folders.
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Comma-separated skill names. Omit for all, pass "" for none.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `multiturn-harness show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Path to a trajectory JSON file.
    pub path: PathBuf,

    /// Print every message after the summary.
    #[arg(short, long)]
    pub transcript: bool,

    /// Output the full trajectory as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_conversation_command(args).await?,
        Commands::Skills(args) => run_skills_command(args)?,
        Commands::Show(args) => run_show_command(args).await?,
    }
    Ok(())
}

/// Condensed view of a finished run.
#[derive(Debug, Serialize)]
struct RunSummary {
    trajectory_id: String,
    termination: String,
    detail: String,
    turn_count: u32,
    message_count: usize,
    duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    trajectory_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    atif_path: Option<PathBuf>,
}

impl RunSummary {
    fn from_trajectory(trajectory: &Trajectory) -> Self {
        Self {
            trajectory_id: trajectory.id().to_string(),
            termination: trajectory.termination_reason().tag().to_string(),
            detail: trajectory.termination_reason().to_string(),
            turn_count: trajectory.turn_count(),
            message_count: trajectory.messages().len(),
            duration_secs: trajectory.metadata().duration().as_secs_f64(),
            trajectory_path: None,
            atif_path: None,
        }
    }

    fn print(&self) {
        println!("Trajectory:  {}", self.trajectory_id);
        println!("Termination: {}", self.detail);
        println!("Turns:       {}", self.turn_count);
        println!("Messages:    {}", self.message_count);
        println!("Duration:    {:.1}s", self.duration_secs);
        if let Some(path) = &self.trajectory_path {
            println!("Saved:       {}", path.display());
        }
        if let Some(path) = &self.atif_path {
            println!("ATIF:        {}", path.display());
        }
    }
}

async fn run_conversation_command(args: RunArgs) -> anyhow::Result<()> {
    let mut spec = RunSpec::from_file(&args.config)
        .with_context(|| format!("Failed to load run file {}", args.config.display()))?;
    if let Some(max_turns) = args.max_turns {
        spec.max_turns = max_turns;
        spec.validate()?;
    }
    if let Some(output) = args.output {
        spec.output_dir = output;
    }

    if let Some(skills) = &spec.skills {
        let installed = install_skills(&skills.dir, &skills.skill_filter(), &skills.target)?;
        info!(count = installed.len(), "Skills ready");
    }

    let provider = if spec.needs_llm() {
        Some(build_llm_provider(args.api_key, args.model)?)
    } else {
        None
    };
    let mut user = spec.build_simulated_user(provider.clone())?;
    let agent = spec.build_agent(provider)?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling conversation");
                cancel.cancel();
            }
        })
    };

    let orchestrator = ConversationOrchestrator::new(spec.orchestrator_config());
    let trajectory = orchestrator
        .run_with_cancellation(&mut user, &agent, &cancel)
        .await;
    interrupt.abort();

    let storage = TrajectoryStorage::new(&spec.output_dir);
    let trajectory_path = storage
        .save(&trajectory)
        .await
        .context("Failed to save trajectory")?;
    let atif_path = storage
        .save_atif(&trajectory)
        .await
        .context("Failed to save ATIF trajectory")?;

    let mut summary = RunSummary::from_trajectory(&trajectory);
    summary.trajectory_path = Some(trajectory_path);
    summary.atif_path = Some(atif_path);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }
    Ok(())
}

fn run_skills_command(args: SkillsArgs) -> anyhow::Result<()> {
    let filter = SkillFilter::parse(args.filter.as_deref());
    let skills = discover_skills(&args.dir, &filter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&skills)?);
    } else if skills.is_empty() {
        println!("No skills selected in {}", args.dir.display());
    } else {
        for skill in &skills {
            println!("{}\t{}", skill.name, skill.path.display());
        }
    }
    Ok(())
}

async fn run_show_command(args: ShowArgs) -> anyhow::Result<()> {
    let trajectory = load_trajectory(&args.path).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&trajectory)?);
        return Ok(());
    }

    RunSummary::from_trajectory(&trajectory).print();
    if args.transcript {
        println!();
        for message in trajectory.messages() {
            println!(
                "[{}] {}: {}",
                message.turn_index(),
                message.role().transcript_label(),
                message.content()
            );
        }
    }
    Ok(())
}

async fn load_trajectory(path: &Path) -> anyhow::Result<Trajectory> {
    load_file(path)
        .await
        .with_context(|| format!("Failed to load trajectory {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command_defaults() {
        let cli = Cli::try_parse_from(["multiturn-harness", "run", "--config", "run.yaml"])
            .expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("run.yaml"));
                assert!(args.max_turns.is_none());
                assert!(args.output.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Run command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_run_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "multiturn-harness",
            "run",
            "-c",
            "run.yaml",
            "--max-turns",
            "3",
            "-o",
            "./out",
            "-j",
            "--log-level",
            "debug",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.max_turns, Some(3));
                assert_eq!(args.output, Some(PathBuf::from("./out")));
                assert!(args.json);
            }
            _ => panic!("Expected Run command"),
        }
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_run_requires_config() {
        assert!(Cli::try_parse_from(["multiturn-harness", "run"]).is_err());
    }

    #[test]
    fn test_skills_empty_filter() {
        let cli = Cli::try_parse_from(["multiturn-harness", "skills", "--dir", "./skills", "--filter", ""])
            .expect("should parse");

        match cli.command {
            Commands::Skills(args) => assert_eq!(args.filter, Some(String::new())),
            _ => panic!("Expected Skills command"),
        }
    }

    #[test]
    fn test_show_command() {
        let cli = Cli::try_parse_from(["multiturn-harness", "show", "traj.json", "-t"])
            .expect("should parse");

        match cli.command {
            Commands::Show(args) => {
                assert_eq!(args.path, PathBuf::from("traj.json"));
                assert!(args.transcript);
            }
            _ => panic!("Expected Show command"),
        }
    }
}
