use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lingua_cache::Priority;
use lingua_cli::session::{self, DemoReport, Speech, StatusReport, Translation};
use lingua_cli::simulated;
use lingua_config::{init_tracing, LinguaConfig, LogBuffer, CONFIG_FILE_NAME};
use lingua_runtime::LinguaRuntime;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "lingua", version, about = "Lingua CLI (translation, speech, resource status)")]
struct Cli {
    /// Path to `lingua.toml` (defaults to `./lingua.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for scripting
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a phrase into the target language
    Translate(TranslateArgs),
    /// Synthesize speech for a phrase
    Speak(SpeakArgs),
    /// Print the memory budget, resource states, cache statistics and recent log lines
    Status(StatusArgs),
    /// Run a scripted session exercising the queue, cache and lifecycle signals
    Demo,
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct TranslateArgs {
    /// Text to translate
    text: String,
    /// Target language; persisted across runs when `[preferences] path` is set
    #[arg(long)]
    to: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    /// Number of recent log lines to include
    #[arg(long, default_value_t = 20)]
    logs: usize,
}

#[derive(Args)]
struct SpeakArgs {
    /// Text to synthesize
    text: String,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let logs = init_tracing(&config.logging);

    if let Command::Config = cli.command {
        if cli.json {
            print_json(&config)?;
        } else {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        return Ok(0);
    }

    let executor = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    executor.block_on(run_command(cli.command, config, logs, cli.json))
}

async fn run_command(
    command: Command,
    config: LinguaConfig,
    logs: Arc<LogBuffer>,
    json: bool,
) -> Result<i32> {
    let runtime = simulated::register(LinguaRuntime::builder(config)).build()?;

    let result = match command {
        Command::Translate(args) => {
            if let Some(language) = args.to.as_deref() {
                runtime.set_target_language(language)?;
            }
            let translation = session::translate(&runtime, &args.text, Priority::Medium).await?;
            print_translation(&translation, json)
        }
        Command::Speak(args) => {
            let speech = session::speak(&runtime, &args.text).await?;
            print_speech(&speech, json)
        }
        Command::Status(args) => {
            let status = StatusReport::capture(&runtime).with_recent_logs(&logs, args.logs);
            print_status(&status, json)
        }
        Command::Demo => {
            let report = session::run_demo(&runtime).await?;
            print_demo(&report, json)
        }
        Command::Config => Ok(()),
    };

    runtime.shutdown();
    result.map(|()| 0)
}

fn load_config(explicit: Option<&Path>) -> Result<LinguaConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if !local.is_file() {
                return Ok(LinguaConfig::default());
            }
            local
        }
    };

    let (config, diagnostics) = LinguaConfig::load_from_path_with_diagnostics(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    for key in &diagnostics.unknown_keys {
        eprintln!("warning: unknown config key `{key}`");
    }
    for warning in &diagnostics.warnings {
        eprintln!("warning: {warning}");
    }
    if !diagnostics.errors.is_empty() {
        let messages: Vec<String> = diagnostics.errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("invalid config {}: {}", path.display(), messages.join("; "));
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_translation(translation: &Translation, json: bool) -> Result<()> {
    if json {
        return print_json(translation);
    }
    println!("{}", translation.text);
    println!(
        "  ({:?} -> {}{})",
        translation.script,
        translation.target_language,
        if translation.cached { ", cached" } else { "" }
    );
    Ok(())
}

fn print_speech(speech: &Speech, json: bool) -> Result<()> {
    if json {
        return print_json(speech);
    }
    println!("speech: \"{}\"", speech.text);
    println!("  bytes: {}", speech.bytes);
    println!("  duration_ms: {}", speech.duration_ms);
    println!("  sample_rate: {}", speech.sample_rate);
    Ok(())
}

fn print_status(status: &StatusReport, json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }
    let memory = &status.memory;
    println!("target_language: {}", status.target_language);
    println!("memory:");
    println!("  budget_bytes: {}", memory.budget.total);
    println!("  resource_bytes: {}", memory.resource_bytes);
    println!("  pending_bytes: {}", memory.pending_bytes);
    println!("  cache_bytes: {}", memory.cache_bytes);
    println!("  pressure: {:?}", memory.pressure);
    println!("resources:");
    for resource in &status.resources {
        println!(
            "  {}: {:?} ({} bytes, {} lease(s))",
            resource.id, resource.status, resource.footprint_bytes, resource.active_leases
        );
        if let Some(error) = &resource.last_error {
            println!("    last_error: {error}");
        }
    }
    let cache = &status.cache;
    println!("cache:");
    println!("  items: {}", cache.item_count);
    println!("  bytes: {}", cache.total_bytes);
    println!("  hits: {}", cache.hits);
    println!("  misses: {}", cache.misses);
    println!("  evictions: {}", cache.evictions);
    println!("  expirations: {}", cache.expirations);
    if !status.recent_logs.is_empty() {
        println!("recent logs:");
        for line in &status.recent_logs {
            println!("  {line}");
        }
    }
    Ok(())
}

fn print_demo(report: &DemoReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    for (idx, step) in report.steps.iter().enumerate() {
        println!("{:>2}. {:<10} {}", idx + 1, step.action, step.detail);
        println!(
            "    loaded: {}  cache items: {}  used: {} / {} bytes",
            step.loaded_resources,
            step.cache_items,
            step.memory.usage_total_bytes(),
            step.memory.budget.total
        );
    }
    println!();
    print_status(&report.final_status, false)
}
