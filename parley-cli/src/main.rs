use clap::{Parser, Subcommand};
use parley_agent::{ConfigError, ParleyConfig, RunnerError};
use parley_tools::RedditClient;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod scenarios;

use scenarios::{
    DEFAULT_REDDIT_QUERIES, DEFAULT_TEAM_QUERIES, DEFAULT_WEATHER_QUERIES, run_reddit,
    run_round_robin, run_team, run_weather,
};

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "info";

/// Model id used when no configuration file is given.
const DEFAULT_OFFLINE_MODEL: &str = "offline-rules";

#[derive(Parser, Debug)]
#[command(name = "parley", version)]
#[command(about = "Parley CLI - run multi-agent conversations against offline agents")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Weather agent that delegates greetings and farewells
    Team {
        /// Query to send; repeat for a multi-turn session
        #[arg(long = "query")]
        queries: Vec<String>,
    },
    /// Single weather agent using the get_weather tool
    Weather {
        #[arg(long = "query")]
        queries: Vec<String>,
    },
    /// Subreddit scout listing hot post titles; needs REDDIT_CLIENT_ID,
    /// REDDIT_CLIENT_SECRET and REDDIT_USER_AGENT
    Reddit {
        #[arg(long = "query")]
        queries: Vec<String>,
    },
    /// Primary and critic taking turns until the critic approves
    RoundRobin {
        #[arg(long, default_value = parley_testing::fixtures::POEM_TASK)]
        task: String,
        /// Drafts the critic waits for before approving
        #[arg(long, default_value_t = 2)]
        approve_after: usize,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("Failed to write transcript: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    fn error_code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.error_code(),
            CliError::Runner(e) => e.error_code(),
            CliError::Io(_) => "IO_ERROR",
        }
    }
}

/// `RUST_LOG` when it is set and parses, otherwise [`DEFAULT_LOG_FILTER`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_tracing(pretty: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr);
    let _ = if pretty {
        builder.pretty().try_init()
    } else {
        builder.json().try_init()
    };
}

/// File configuration if given, otherwise the offline defaults; `PARLEY_*`
/// variables apply either way.
fn load_config(path: Option<&PathBuf>) -> Result<ParleyConfig, ConfigError> {
    let config = match path {
        Some(path) => ParleyConfig::load_from_file(path)?,
        None => {
            let mut config = ParleyConfig::offline(DEFAULT_OFFLINE_MODEL);
            config.apply_env(|name| std::env::var(name).ok());
            config
        }
    };

    if !config.model.is_offline() {
        return Err(ConfigError::invalid(
            "model.provider",
            format!(
                "'{}' is not available from the command line; use 'offline'",
                config.model.provider
            ),
        ));
    }
    config.validate()?;
    Ok(config)
}

fn or_defaults(queries: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if queries.is_empty() {
        defaults.iter().map(|q| q.to_string()).collect()
    } else {
        queries
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Team { queries } => {
            run_team(config, &or_defaults(queries, DEFAULT_TEAM_QUERIES), &mut out).await
        }
        Commands::Weather { queries } => {
            run_weather(config, &or_defaults(queries, DEFAULT_WEATHER_QUERIES), &mut out).await
        }
        Commands::Reddit { queries } => {
            let client = RedditClient::from_env();
            if !client.has_credentials() {
                tracing::warn!("Reddit API credentials not set; the scout will report the gap");
            }
            run_reddit(
                config,
                Arc::new(client),
                &or_defaults(queries, DEFAULT_REDDIT_QUERIES),
                &mut out,
            )
            .await
        }
        Commands::RoundRobin {
            task,
            approve_after,
        } => run_round_robin(config, &task, approve_after, &mut out).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.pretty);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, code = e.error_code(), "Conversation failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_queries() {
        let cli = Cli::try_parse_from([
            "parley", "team", "--query", "Hello there!", "--query", "bye",
        ])
        .unwrap();
        match cli.command {
            Commands::Team { queries } => assert_eq!(queries, ["Hello there!", "bye"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn round_robin_has_defaults() {
        let cli = Cli::try_parse_from(["parley", "--pretty", "round-robin"]).unwrap();
        assert!(cli.pretty);
        match cli.command {
            Commands::RoundRobin {
                task,
                approve_after,
            } => {
                assert_eq!(task, parley_testing::fixtures::POEM_TASK);
                assert_eq!(approve_after, 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rust_log_overrides_the_default_level() {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            log_filter(Some("warn,parley_agent=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn reddit_takes_queries() {
        let cli = Cli::try_parse_from(["parley", "reddit", "--query", "top 3 from r/rust"]).unwrap();
        match cli.command {
            Commands::Reddit { queries } => assert_eq!(queries, ["top 3 from r/rust"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn empty_queries_fall_back_to_defaults() {
        assert_eq!(or_defaults(Vec::new(), &["hi"]), ["hi"]);
        assert_eq!(or_defaults(vec!["bye".into()], &["hi"]), ["bye"]);
    }
}
