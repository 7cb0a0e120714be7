// # dhcp-hosts-updater
//
// Thin command-line layer over hosts-core:
// 1. Parse the command line
// 2. Initialize logging
// 3. Register the built-in snapshot sources
// 4. Run one update (or list providers)
//
// All reconciliation logic lives in hosts-core.
//
// ## Configuration
//
// Provider flags are given as `-f key=value`. A flag missing from the
// command line is read from `HOSTS_UPDATER_<FLAG>` (upper-case, `-` → `_`),
// which keeps passwords out of the process list:
//
// ```bash
// export HOSTS_UPDATER_PASSWORD=hunter2
// dhcp-hosts-updater update edgeos -f address=192.168.1.1 -f username=admin
// ```
//
// - `HOSTS_UPDATER_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Exit codes
//
// - 0: Success
// - 1: Configuration error (bad arguments, unknown provider, missing flag)
// - 2: Runtime error (router unreachable, unreadable hosts file, failed save)

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hosts_core::{
    NamePolicy, SourceConfig, SourceRegistry, StoreConfig, UpdateSummary, Updater, UpdaterConfig,
    create_store,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Prefix of environment variables read by the binary
const ENV_PREFIX: &str = "HOSTS_UPDATER_";

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostsExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or bad invocation
    ConfigError = 1,
    /// Runtime error (source, store, parse)
    RuntimeError = 2,
}

impl From<HostsExitCode> for ExitCode {
    fn from(code: HostsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "dhcp-hosts-updater")]
#[command(about = "Keep a hosts file in step with a router's DHCP clients", version)]
struct Cli {
    /// Log level: trace, debug, info, warn, error [env: HOSTS_UPDATER_LOG_LEVEL]
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update the hosts file from a router
    Update(UpdateArgs),

    /// List the available providers and their flags
    Providers,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// Provider to read hosts from (see `providers`)
    provider: String,

    /// Provider flag; can be given multiple times
    #[arg(short = 'f', long = "flag", value_name = "KEY=VALUE")]
    flags: Vec<String>,

    /// Hosts file to update (default: the system hosts file)
    #[arg(long, value_name = "PATH")]
    hosts_file: Option<PathBuf>,

    /// Name a device by its MAC address; can be given multiple times
    #[arg(long = "mac-override", value_name = "MAC=NAME")]
    mac_overrides: Vec<String>,

    /// Keep whitespace in reported names instead of replacing it with '-';
    /// names that still contain whitespace are then skipped
    #[arg(long)]
    keep_spaces: bool,

    /// Print the resulting table as JSON instead of saving it
    #[arg(long)]
    dry_run: bool,
}

/// Environment variable consulted for a provider flag
fn env_var_name(flag: &str) -> String {
    format!("{}{}", ENV_PREFIX, flag.to_uppercase().replace('-', "_"))
}

/// Split a `key=value` argument
fn parse_flag(raw: &str) -> hosts_core::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(hosts_core::Error::config(format!(
            "flag {:?} is not in key=value form",
            raw
        ))),
    }
}

/// Build the source configuration from command-line flags, falling back to
/// the environment for any flag the provider knows about
fn source_config<F>(
    registry: &SourceRegistry,
    provider: &str,
    raw_flags: &[String],
    lookup_env: F,
) -> hosts_core::Result<SourceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SourceConfig::new(provider);
    for raw in raw_flags {
        let (key, value) = parse_flag(raw)?;
        config.flags.insert(key, value);
    }

    if let Some(factory) = registry.get(provider) {
        for flag in factory.flags() {
            if config.flags.contains_key(flag.name) {
                continue;
            }
            let var = env_var_name(flag.name);
            if let Some(value) = lookup_env(&var).filter(|v| !v.is_empty()) {
                tracing::debug!("Using {} for flag {}", var, flag.name);
                config.flags.insert(flag.name.to_string(), value);
            }
        }
    }

    Ok(config)
}

/// Resolve the log level from the command line or environment
fn log_level(cli: Option<&str>, env: Option<String>) -> Result<Level> {
    let raw = cli
        .map(str::to_string)
        .or(env)
        .unwrap_or_else(|| "info".to_string());

    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

/// Register every source compiled into this binary
fn build_registry() -> SourceRegistry {
    #[allow(unused_mut)]
    let mut registry = SourceRegistry::new();

    #[cfg(feature = "edgeos")]
    hosts_source_edgeos::register(&mut registry);

    #[cfg(feature = "udm")]
    hosts_source_udm::register(&mut registry);

    registry
}

/// Exit code for a failed run
fn exit_code_for(err: &anyhow::Error) -> HostsExitCode {
    match err.downcast_ref::<hosts_core::Error>() {
        Some(e) if e.is_config() => HostsExitCode::ConfigError,
        _ => HostsExitCode::RuntimeError,
    }
}

fn summary_line(summary: &UpdateSummary, dry_run: bool) -> String {
    let (added, removed, enabled) = summary.counts();
    let outcome = if dry_run {
        "dry run, not saved"
    } else if summary.saved {
        "saved"
    } else {
        "already up to date"
    };
    format!(
        "{}: {} host(s) observed, {} named; {} added, {} removed, {} enabled ({})",
        summary.provider, summary.observed, summary.mapped, added, removed, enabled, outcome
    )
}

fn print_providers(registry: &SourceRegistry) {
    for id in registry.list_sources() {
        let Some(factory) = registry.get(id) else {
            continue;
        };
        println!("{} - {}", id, factory.description());
        for flag in factory.flags() {
            let kind = match (flag.required, flag.secret) {
                (true, true) => "required, secret",
                (true, false) => "required",
                (false, _) => "optional",
            };
            println!(
                "    -f {:<12} {:<18} {} [env: {}]",
                flag.name,
                kind,
                flag.description,
                env_var_name(flag.name)
            );
        }
    }
}

async fn run_update(registry: &SourceRegistry, args: UpdateArgs) -> Result<()> {
    let source = source_config(registry, &args.provider, &args.flags, |name| {
        env::var(name).ok()
    })?;

    let policy = NamePolicy::from_override_args(args.mac_overrides.as_slice())?
        .with_replace_whitespace(!args.keep_spaces);

    let store_config = args
        .hosts_file
        .map(|path| StoreConfig::File { path })
        .unwrap_or_default();

    let updater = Updater::new(
        registry,
        create_store(&store_config),
        UpdaterConfig::new()
            .with_dry_run(args.dry_run)
            .with_name_policy(policy),
    );

    info!("Updating hosts from {}", source.provider);
    let summary = updater.update(&source).await?;

    if args.dry_run {
        let json = serde_json::to_string_pretty(&summary.table)
            .context("Failed to render table as JSON")?;
        println!("{}", json);
        eprintln!("{}", summary_line(&summary, true));
    } else {
        println!("{}", summary_line(&summary, false));
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                HostsExitCode::ConfigError
            } else {
                HostsExitCode::Success
            };
            return code.into();
        }
    };

    let level = match log_level(
        cli.log_level.as_deref(),
        env::var(format!("{}LOG_LEVEL", ENV_PREFIX)).ok(),
    ) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return HostsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HostsExitCode::ConfigError.into();
    }

    let registry = build_registry();

    let args = match cli.command {
        Commands::Providers => {
            print_providers(&registry);
            return HostsExitCode::Success.into();
        }
        Commands::Update(args) => args,
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HostsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_update(&registry, args).await {
            Ok(()) => HostsExitCode::Success,
            Err(e) => {
                let code = exit_code_for(&e);
                error!("Update failed: {:#}", e);
                eprintln!("Error: {:#}", e);
                code
            }
        }
    });

    code.into()
}
