use anyhow::{Context, Result};
use betteruptime_provider::api::auth;
use betteruptime_provider::config::ProviderConfig;
use betteruptime_provider::diagnostics::{Diagnostic, Outcome};
use betteruptime_provider::provider::Provider;
use betteruptime_provider::{resource, server, VERSION};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Terraform provider for Better Stack Uptime
#[derive(Parser, Debug)]
#[command(name = "terraform-provider-betteruptime", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level for debugging (falls back to TF_LOG)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Log file (falls back to TF_LOG_PATH)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON-lines protocol on stdin/stdout (default)
    Serve,
    /// Print the provider schema
    Schema {
        #[arg(long, value_enum, default_value = "json")]
        format: SchemaFormat,
    },
    /// List resource and data source type names
    Resources,
    /// Import an existing object and print its state
    Import {
        /// Resource type, e.g. betteruptime_status_page_section
        type_name: String,
        /// Import ID, e.g. 123 or <status_page_id>/<id>
        id: String,
    },
    /// Run a data source lookup and print the result
    Lookup {
        /// Data source type, e.g. betteruptime_monitor
        data_source: String,
        /// Configuration values as key=value
        #[arg(long = "set", value_parser = parse_key_val)]
        set: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `TF_LOG` uses upper case names such as `DEBUG`
    fn from_env() -> Self {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|value| LogLevel::from_str(value.trim(), true).ok())
            .unwrap_or(LogLevel::Off)
    }

    fn directive(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let directive = level.directive()?;
    let log_path = log_file
        .or_else(|| std::env::var_os("TF_LOG_PATH").map(PathBuf::from))
        .unwrap_or_else(get_log_path);

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // stdout carries the protocol, so logging is file-only
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), err);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::new(format!(
        "betteruptime_provider={0},terraform_provider_betteruptime={0}",
        directive
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("terraform-provider-betteruptime {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = auth::get_config_dir() {
        return config_dir.join("provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".betteruptime").join("provider.log");
    }
    PathBuf::from("terraform-provider-betteruptime.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = args.log_level.unwrap_or_else(LogLevel::from_env);
    let _log_guard = setup_logging(level, args.log_file);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let mut provider = Provider::new();
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            server::serve(&mut provider, stdin, tokio::io::stdout()).await
        },
        Command::Schema { format } => {
            let schema = resource::provider_schema();
            let text = match format {
                SchemaFormat::Json => serde_json::to_string_pretty(&schema)?,
                SchemaFormat::Yaml => serde_yaml::to_string(&schema)?,
            };
            println!("{}", text);
            Ok(())
        },
        Command::Resources => {
            for name in resource::all_resource_names() {
                println!("resource     {}", name);
            }
            for name in resource::all_data_source_names() {
                println!("data source  {}", name);
            }
            Ok(())
        },
        Command::Import { type_name, id } => {
            let provider = configured_provider()?;
            print_outcome(provider.import_resource_state(&type_name, &id).await)
        },
        Command::Lookup { data_source, set } => {
            let config: Map<String, Value> = set
                .into_iter()
                .map(|(key, raw)| {
                    // Numbers and booleans keep their JSON type
                    let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                    (key, value)
                })
                .collect();
            let provider = configured_provider()?;
            print_outcome(provider.read_data_source(&data_source, &config).await)
        },
    }
}

/// Provider configured from the environment and credentials file
fn configured_provider() -> Result<Provider> {
    Provider::configure(ProviderConfig::default()).context("Failed to configure provider")
}

fn print_outcome<T: Serialize>(outcome: Outcome<T>) -> Result<()> {
    for diagnostic in &outcome.diagnostics {
        print_diagnostic(diagnostic);
    }
    if outcome.has_errors() {
        let errors = outcome.diagnostics.iter().filter(|d| d.is_error()).count();
        anyhow::bail!("Operation failed with {} error(s)", errors);
    }
    if let Some(result) = &outcome.result {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let location = diagnostic
        .attribute
        .as_deref()
        .map(|a| format!(" ({})", a))
        .unwrap_or_default();
    eprintln!(
        "{:?}: {}{}",
        diagnostic.severity, diagnostic.summary, location
    );
    if !diagnostic.detail.is_empty() {
        eprintln!("  {}", diagnostic.detail);
    }
}
