//! Radar CLI - command-line interface for founder team analysis
//!
//! Reads a team description (JSON), runs the research and assessment pipeline and writes
//! the resulting analysis as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use radar_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, LogFormat,
    LoggingConfig, RadarConfig, TeamInput,
};
use radar_pipeline::TeamOrchestrator;
use radar_sources::{LlmGateway, SiumaiChatModel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "radar")]
#[command(about = "Research and assess startup founding teams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log format: compact, pretty or json
    #[arg(long, default_value = "compact")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a founding team described in a JSON file
    Analyze {
        /// Team input file (`startup_name`, `founders`, optional `interviews`)
        input: PathBuf,

        /// Write the analysis to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Append raw stage outputs to this audit log (JSON lines)
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Show which data sources and LLM provider are usable with the current configuration
    Check {
        /// Also send a one-line prompt to the configured LLM
        #[arg(long)]
        probe: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration (secrets redacted)
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Validate configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let mut logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    logging_config.format = parse_log_format(&cli.log_format)?;

    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting radar CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze {
            input,
            output,
            pretty,
            audit_log,
        } => {
            let config = load_config(cli.config.as_deref())?;
            handle_analyze(config, &input, output, pretty, audit_log).await?;
        }
        Commands::Check { probe } => {
            let config = load_config(cli.config.as_deref())?;
            handle_check(&config);
            if probe {
                handle_probe(&config).await?;
            }
        }
        Commands::Config {
            show,
            init,
            validate,
        } => {
            handle_config(cli.config.as_deref(), show, init, validate)?;
        }
    }

    Ok(())
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => bail!("Unknown log format '{}' (expected compact, pretty or json)", other),
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|d| d.join("radar").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".radar").join("config.toml")),
        Some(PathBuf::from("radar.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// File configuration (explicit path, then default locations) overlaid with the environment
fn load_config(config_path: Option<&Path>) -> Result<RadarConfig> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            RadarConfig::from_file(path)?
        }
        None => match default_config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                RadarConfig::from_file(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                RadarConfig::default()
            }
        },
    };

    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

async fn handle_analyze(
    mut config: RadarConfig,
    input: &Path,
    output: Option<PathBuf>,
    pretty: bool,
    audit_log: Option<PathBuf>,
) -> Result<()> {
    log_operation_start!("analyze", input = %input.display());

    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read team input {}", input.display()))?;
    let team: TeamInput = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid team input in {}", input.display()))?;

    if let Some(path) = audit_log {
        config.audit.enabled = true;
        config.audit.path = Some(path);
    }

    let orchestrator = TeamOrchestrator::from_config(config).await.map_err(|e| {
        log_operation_error!("analyze", e);
        e
    })?;

    let analysis = orchestrator.run_team_analysis(team).await;
    for error in &analysis.errors {
        warn!(stage = %error.stage, error = %error.error, "Founder could not be analyzed");
    }

    let json = if pretty {
        serde_json::to_string_pretty(&analysis)?
    } else {
        serde_json::to_string(&analysis)?
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write analysis to {}", path.display()))?;
            println!("Analysis written to {}", path.display());
        }
        None => println!("{}", json),
    }

    log_operation_success!(
        "analyze",
        run_id = %analysis.run_id,
        founders = analysis.comprehensive_data.individual_assessments.len(),
        errors = analysis.errors.len()
    );
    Ok(())
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn handle_check(config: &RadarConfig) {
    let status = |ok: bool| if ok { "ok" } else { "missing" };

    println!("LLM provider:     {} ({})", config.llm.provider, config.llm.model);
    println!(
        "  api key:        {}",
        if config.llm.provider == "ollama" {
            "not required"
        } else {
            status(is_set(&config.llm.api_key))
        }
    );
    println!(
        "LinkedIn / Web:   {} (TAVILY_API_KEY)",
        status(is_set(&config.search.api_key))
    );
    println!(
        "GitHub:           ok{}",
        if is_set(&config.github.token) {
            ""
        } else {
            " (unauthenticated, low rate limit)"
        }
    );
    println!(
        "Academic metrics: ok{}",
        if is_set(&config.openalex.mailto) {
            ""
        } else {
            " (set OPENALEX_MAILTO for the polite pool)"
        }
    );

    match config.validate() {
        Ok(()) => println!("Configuration:    valid"),
        Err(e) => println!("Configuration:    invalid: {}", e),
    }
}

async fn handle_probe(config: &RadarConfig) -> Result<()> {
    log_operation_start!("llm_probe", provider = %config.llm.provider);

    let model = SiumaiChatModel::new(&config.llm).await?;
    let gateway = LlmGateway::new(Arc::new(model), &config.llm);
    let started = Instant::now();

    match gateway
        .complete("You are a connectivity check.", "Reply with the single word OK.")
        .await
    {
        Ok(reply) => {
            println!(
                "LLM probe:        ok ({} in {} ms, replied {:?})",
                gateway.describe(),
                started.elapsed().as_millis(),
                reply.trim()
            );
            log_operation_success!("llm_probe");
            Ok(())
        }
        Err(e) => {
            log_operation_error!("llm_probe", e);
            println!("LLM probe:        failed: {}", e);
            Err(e.into())
        }
    }
}

fn redacted(config: &RadarConfig) -> RadarConfig {
    let hide = |value: &Option<String>| value.as_ref().map(|_| "********".to_string());

    let mut shown = config.clone();
    shown.llm.api_key = hide(&config.llm.api_key);
    shown.search.api_key = hide(&config.search.api_key);
    shown.github.token = hide(&config.github.token);
    shown
}

fn handle_config(config_path: Option<&Path>, show: bool, init: bool, validate: bool) -> Result<()> {
    if init {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => dirs::config_dir()
                .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
                .context("Could not determine a configuration directory")?
                .join("radar")
                .join("config.toml"),
        };
        if path.exists() {
            bail!("Configuration already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        RadarConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {}", path.display());
        println!("Add your API keys there or export LLM_API_KEY and TAVILY_API_KEY.");
    }

    if show {
        let config = load_config(config_path)?;
        println!("{}", toml::to_string_pretty(&redacted(&config))?);
    }

    if validate {
        let config = load_config(config_path)?;
        match config.validate() {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => {
                println!("Configuration validation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(parse_log_format("JSON").unwrap(), LogFormat::Json);
        assert_eq!(parse_log_format("pretty").unwrap(), LogFormat::Pretty);
        assert!(parse_log_format("xml").is_err());
    }

    #[test]
    fn test_show_redacts_secrets() {
        let mut config = RadarConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());
        config.github.token = None;

        let shown = redacted(&config);
        assert_eq!(shown.llm.api_key.as_deref(), Some("********"));
        assert!(shown.github.token.is_none());
        assert_eq!(shown.llm.model, config.llm.model);
    }

    #[test]
    fn test_explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radar.toml");
        std::fs::write(&path, "[llm]\nprovider = \"anthropic\"\nmodel = \"claude-x\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.pipeline.max_concurrent_founders, 5);
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from(["radar", "-v", "analyze", "team.json", "--pretty"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { input, pretty, .. } => {
                assert_eq!(input, PathBuf::from("team.json"));
                assert!(pretty);
            }
            _ => panic!("expected analyze"),
        }
    }
}
