mod fetch;
mod period;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clientpulse_core::Granularity;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "clientpulse")]
#[command(about = "Fetch and normalize client marketing data across GA4, Meta Ads, and LinkedIn Ads")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every connected platform for one client and print the report JSON
    Fetch {
        /// Client id
        #[arg(long)]
        client: Uuid,
        /// Agency that owns the client
        #[arg(long)]
        agency: Uuid,
        #[command(flatten)]
        period: PeriodArgs,
        /// Serve seeded mock data instead of calling any platform
        #[arg(long)]
        mock: bool,
    },
    /// Print the current and previous reporting periods
    Period {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// How the reporting period is chosen: either the last completed
/// month/week before `--reference`, or an explicit `--start`/`--end`.
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
struct PeriodArgs {
    /// monthly or weekly
    #[arg(long, default_value = "monthly")]
    granularity: Granularity,
    /// Day the period is computed relative to (defaults to today, UTC)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    reference: Option<NaiveDate>,
    /// Explicit first day of the period (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    /// Explicit last day of the period (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

fn init_tracing(fallback_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Loads configuration and installs the subscriber at its log level.
fn load_config() -> anyhow::Result<clientpulse_core::AppConfig> {
    let config = clientpulse_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    tracing::debug!(env = %config.env, "configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Fetch {
            client,
            agency,
            period,
            mock,
        }) => {
            let config = load_config()?;
            fetch::run_fetch(&config, client, agency, &period, mock).await
        }
        Some(Commands::Period { period }) => {
            init_tracing("info")?;
            period::run_period(&period)
        }
        Some(Commands::Db { command }) => {
            let config = load_config()?;
            let pool_config = clientpulse_db::PoolConfig::from_app_config(&config);
            let pool = clientpulse_db::connect_pool(&config.database_url, pool_config).await?;
            match command {
                DbCommands::Migrate => {
                    clientpulse_db::run_migrations(&pool).await?;
                    println!("migrations applied");
                }
                DbCommands::Ping => {
                    clientpulse_db::ping(&pool).await?;
                    println!("database reachable");
                }
            }
            Ok(())
        }
        None => {
            println!("clientpulse ready; run `clientpulse --help` for commands");
            Ok(())
        }
    }
}
