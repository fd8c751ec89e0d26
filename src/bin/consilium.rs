//! consilium: orchestrator CLI
//!
//! Builds an orchestrator from the config file and `<PROVIDER>_API_KEY`
//! environment variables, then runs one command and prints JSON.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use consilium::{
    AnalysisType, BuildInfo, Config, Credentials, OrchestratorBuilder, ProviderId, RequestOptions,
};

/// Consilium multi-provider orchestrator
#[derive(Parser)]
#[command(name = "consilium")]
#[command(version = consilium::PKG_VERSION)]
#[command(about = "Multi-provider AI request orchestrator")]
struct Args {
    /// Config file (default: ~/.consilium/config.toml, then /etc/consilium/config.toml)
    #[arg(short, long, env = "CONSILIUM_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the startup health probe
    #[arg(long)]
    no_probe: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print build version and git metadata
    Version,

    /// Probe every configured provider and print the health report
    Health,

    /// Generate text
    Generate {
        /// Prompt (or omit to read from stdin)
        prompt: Option<String>,
        /// Preferred provider
        #[arg(short, long)]
        provider: Option<ProviderId>,
        /// Model override
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, default_value_t = consilium::types::DEFAULT_MAX_TOKENS)]
        max_tokens: u32,
        #[arg(long, default_value_t = consilium::types::DEFAULT_TEMPERATURE)]
        temperature: f32,
        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
        /// Attempts including the first
        #[arg(long, default_value_t = consilium::types::DEFAULT_RETRY_COUNT)]
        retries: u32,
    },

    /// Analyze a contract file
    Analyze {
        /// Contract text file (or `-` for stdin)
        file: PathBuf,
        /// general, risk, compliance or summary
        #[arg(short = 't', long = "type", default_value = "general")]
        analysis_type: AnalysisType,
        /// Merge answers from several providers
        #[arg(long)]
        consensus: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Command::Version = args.command {
        return print_json(&BuildInfo::current());
    }
    tracing::debug!(version = %BuildInfo::current(), "consilium starting");

    let config = Config::load(args.config.as_deref())?;
    let credentials = Credentials::from_env();
    let orchestrator = OrchestratorBuilder::from_config(&config, &credentials).build()?;
    if orchestrator.providers().is_empty() {
        tracing::warn!("no provider credentials found; set e.g. OPENAI_API_KEY");
    }

    match args.command {
        Command::Version => {}

        Command::Health => {
            orchestrator.initialize().await;
            print_json(&orchestrator.health_status())?;
        }

        Command::Generate {
            prompt,
            provider,
            model,
            max_tokens,
            temperature,
            no_cache,
            retries,
        } => {
            if !args.no_probe {
                orchestrator.initialize().await;
            }
            let prompt = resolve_text(prompt, "generate")?;
            let mut options = RequestOptions::new()
                .max_tokens(max_tokens)
                .temperature(temperature)
                .use_cache(!no_cache)
                .retry_count(retries);
            if let Some(provider) = provider {
                options = options.provider(provider);
            }
            if let Some(model) = model {
                options = options.model(model);
            }
            let response = orchestrator.generate_text(&prompt, &options).await?;
            print_json(&response)?;
        }

        Command::Analyze {
            file,
            analysis_type,
            consensus,
        } => {
            if !args.no_probe {
                orchestrator.initialize().await;
            }
            let text = if file.as_os_str() == "-" {
                read_stdin()?
            } else {
                std::fs::read_to_string(&file)?
            };
            let result = orchestrator
                .analyze_contract(&text, analysis_type, consensus)
                .await?;
            print_json(&result)?;
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Use the argument if given, otherwise read stdin (refusing an interactive terminal).
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    match arg {
        Some(text) => Ok(text),
        None if io::stdin().is_terminal() => {
            Err(format!("{command}: provide text as an argument or pipe it on stdin").into())
        }
        None => read_stdin(),
    }
}

fn read_stdin() -> Result<String, Box<dyn std::error::Error>> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
