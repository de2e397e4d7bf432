//! Brisk CLI: inspect the builtin registry and the resolved runtime config.

use brisk_builtins::{standard_registry, BuiltinMeta, BuiltinRegistry};
use brisk_runtime::RuntimeConfig;
use clap::{Parser as ClapParser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BRISK_LOG";
const DEFAULT_FILTER: &str = "brisk=info";

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}
fn gray(s: &str) -> String {
    format!("\x1b[90m{}\x1b[0m", s)
}

#[derive(ClapParser)]
#[command(name = "brisk", version, about = "Brisk host services and builtins")]
struct Cli {
    /// Load this brisk.toml instead of searching for one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered builtin
    Builtins {
        /// Print the metadata array as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one builtin, by free name or `receiver.method`
    Describe {
        name: String,
    },
    /// Print the resolved runtime configuration as TOML
    Config,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match RuntimeConfig::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => fail(&e.to_string()),
        },
        None => RuntimeConfig::load(),
    };
    tracing::debug!(exec_root = %config.resolved_exec_root().display(), "config loaded");

    let registry = standard_registry();
    let result = match cli.command {
        Commands::Builtins { json } => cmd_builtins(&registry, json),
        Commands::Describe { name } => cmd_describe(&registry, &name),
        Commands::Config => cmd_config(&config),
    };
    match result {
        Ok(out) => println!("{}", out),
        Err(e) => fail(&e),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", red("error:"), message);
    std::process::exit(1);
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_builtins(registry: &BuiltinRegistry, json: bool) -> Result<String, String> {
    if json {
        return registry.metadata_json().map_err(|e| e.to_string());
    }
    let lines = registry
        .list_all()
        .iter()
        .map(|meta| format!("{:>6}  {}", meta.id.to_string(), meta.signature()))
        .collect::<Vec<_>>();
    Ok(lines.join("\n"))
}

fn cmd_describe(registry: &BuiltinRegistry, name: &str) -> Result<String, String> {
    let meta = find(registry, name).ok_or_else(|| format!("no builtin named '{}'", name))?;

    let mut out = vec![bold(&meta.signature()), format!("  id:     {}", meta.id)];
    match (&meta.receiver, &meta.method) {
        (Some(receiver), Some(method)) => {
            out.push(format!("  method: {} on {}", method, receiver));
        }
        _ => out.push(format!("  kind:   {}", gray("function"))),
    }
    for (name, ty) in meta.param_names.iter().zip(&meta.param_types) {
        out.push(format!("  param:  {}: {}", name, ty));
    }
    out.push(format!("  result: {}", meta.result));
    Ok(out.join("\n"))
}

fn cmd_config(config: &RuntimeConfig) -> Result<String, String> {
    toml::to_string_pretty(config).map_err(|e| e.to_string())
}

/// Free functions resolve through the name index; methods by their
/// `receiver.method` display name.
fn find(registry: &BuiltinRegistry, name: &str) -> Option<BuiltinMeta> {
    if let Some(builtin) = registry.lookup_by_name(name) {
        return Some(builtin.meta().clone());
    }
    registry
        .list_all()
        .into_iter()
        .find(|meta| meta.is_method() && meta.name == name)
}
