//! Task loop runner.
//!
//! Runs an AI coding agent against a PRD task list, one attempt per
//! iteration, until every task passes or the iteration budget runs out.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};

use taskloop::core::budget::IterationBudget;
use taskloop::core::types::{AgentKind, AttemptStatus};
use taskloop::exit_codes;
use taskloop::io::config::{ConfigOverrides, DEFAULT_CONFIG_FILE, LoopConfig, resolve_config};
use taskloop::io::context::RunContext;
use taskloop::io::display::{ColorMode, DisplayConfig};
use taskloop::io::executor::AgentExecutor;
use taskloop::io::init::{TaskPaths, ensure_progress_file};
use taskloop::io::interrupt::InterruptFlag;
use taskloop::io::prompt::PromptBuilder;
use taskloop::io::task_source::{TaskSource, open_task_source};
use taskloop::logging;
use taskloop::looping::{LoopOutcome, LoopStop, run_loop};
use taskloop::status::status_from_input;

#[derive(Parser)]
#[command(
    name = "taskloop",
    version,
    about = "Run an AI coding agent against a task list until every task passes"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Loop the agent over the task list.
    Run(RunArgs),
    /// Print completed/remaining counts and the next task.
    Status {
        /// Task list file, or a directory containing one.
        #[arg(default_value = ".")]
        prd: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Task list file, or a directory containing one.
    #[arg(default_value = ".")]
    prd: PathBuf,
    /// Agent CLI to drive.
    #[arg(long, value_enum)]
    agent: Option<AgentKind>,
    /// Model name passed through to the agent.
    #[arg(long)]
    model: Option<String>,
    /// Stop after this many iterations (0 = unlimited).
    #[arg(long)]
    max_iterations: Option<u32>,
    /// Lines of agent output shown under the status line.
    #[arg(long)]
    log_lines: Option<usize>,
    /// Let the agent ask for approval instead of auto-approving.
    #[arg(long)]
    safe: bool,
    /// Prompt template file replacing the built-in one.
    #[arg(long, value_name = "FILE")]
    prompt: Option<PathBuf>,
    #[arg(long, value_enum)]
    color: Option<ColorMode>,
    /// TOML config file [default: taskloop.toml if present].
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the prompt for the next task and exit without launching the agent.
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            agent: self.agent,
            model: self.model.clone(),
            max_iterations: self.max_iterations,
            log_lines: self.log_lines,
            safe: self.safe,
            color: self.color,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_codes::OK,
                _ => exit_codes::INVALID,
            };
            std::process::exit(code);
        }
    };
    logging::init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => cmd_run(&args),
        Command::Status { prd } => cmd_status(&prd),
    }
}

fn cmd_run(args: &RunArgs) -> Result<i32> {
    let config = load_run_config(args)?;
    let paths = TaskPaths::resolve(&args.prd)?;
    let source = open_task_source(&paths.task_path)?;
    let prompts = match &args.prompt {
        Some(path) => PromptBuilder::from_override_file(path)?,
        None => PromptBuilder::new(None)?,
    };

    if args.dry_run {
        return dry_run(source.as_ref(), &prompts, &paths);
    }

    let executor = AgentExecutor::new(config.agent);
    executor.ensure_available()?;
    let display = DisplayConfig::detect(config.color);
    ensure_progress_file(&paths.progress_path)?;
    let interrupt = InterruptFlag::install()?;

    let workdir = env::current_dir().context("resolve working directory")?;
    let mut ctx = RunContext::new(config.agent, paths, workdir);
    ctx.model = config.model.clone();
    ctx.safe_mode = config.safe;
    ctx.budget = IterationBudget::new(config.max_iterations);
    ctx.log_lines = config.log_lines;
    ctx.display = display;

    print_header(&ctx, source.as_ref())?;
    let mut failed = 0u32;
    let outcome = run_loop(
        &mut ctx,
        source.as_ref(),
        &executor,
        &prompts,
        &interrupt,
        |attempt| {
            if attempt.status != AttemptStatus::Succeeded {
                failed += 1;
            }
        },
    )?;
    print_summary(display, &outcome, failed)?;

    Ok(match outcome.stop {
        LoopStop::Interrupted => exit_codes::INTERRUPTED,
        LoopStop::Completed | LoopStop::BudgetExhausted { .. } => exit_codes::OK,
    })
}

fn cmd_status(prd: &Path) -> Result<i32> {
    let report = status_from_input(prd)?;
    print!("{}", report.render());
    Ok(exit_codes::OK)
}

/// Explicit `--config` must exist; the default file is optional.
fn load_run_config(args: &RunArgs) -> Result<LoopConfig> {
    let path = match &args.config {
        Some(path) if !path.exists() => {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
        Some(path) => path.clone(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };
    resolve_config(&path, &args.overrides())
}

fn dry_run(source: &dyn TaskSource, prompts: &PromptBuilder, paths: &TaskPaths) -> Result<i32> {
    let counts = source.counts()?;
    if counts.remaining == 0 {
        println!("All {} tasks complete; nothing to run.", counts.total());
        return Ok(exit_codes::OK);
    }
    let label = source
        .next_task_label()?
        .unwrap_or_else(|| format!("Task {}", counts.completed + 1));
    println!(
        "Next task [{}/{}]: {label}\n",
        counts.completed + 1,
        counts.total()
    );
    println!("{}", prompts.build(source.format(), paths)?);
    Ok(exit_codes::OK)
}

fn print_header(ctx: &RunContext, source: &dyn TaskSource) -> Result<()> {
    let counts = source.counts()?;
    let budget = if ctx.budget.is_unlimited() {
        "unlimited".to_string()
    } else {
        ctx.budget.max_iterations().to_string()
    };
    let model = ctx.model.as_deref().unwrap_or("default model");
    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "{}",
        ctx.display.accent(&format!(
            "taskloop: {} ({model}{}) on {} [{}]",
            ctx.agent.as_str(),
            if ctx.safe_mode { ", safe" } else { "" },
            ctx.paths.task_path.display(),
            source.format().as_str()
        ))
    )?;
    writeln!(
        stdout,
        "{}",
        ctx.display.muted(&format!(
            "{}/{} tasks complete, max iterations: {budget}",
            counts.completed,
            counts.total()
        ))
    )?;
    stdout.flush()?;
    Ok(())
}

fn print_summary(display: DisplayConfig, outcome: &LoopOutcome, failed: u32) -> Result<()> {
    let attempts = outcome.attempts;
    let noun = if attempts == 1 { "iteration" } else { "iterations" };
    let line = match &outcome.stop {
        LoopStop::Completed => display.success(&format!(
            "All tasks complete after {attempts} {noun} ({failed} failed)."
        )),
        LoopStop::BudgetExhausted {
            max_iterations,
            remaining,
        } => display.notice(&format!(
            "Reached the iteration budget ({max_iterations}) after {attempts} {noun}; \
             {remaining} task(s) remaining."
        )),
        LoopStop::Interrupted => {
            display.notice(&format!("Interrupted after {attempts} {noun}."))
        }
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
