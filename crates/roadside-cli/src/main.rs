mod location;
mod requests;

use clap::{Parser, Subcommand};
use roadside_core::{RequestStatus, ServiceType};
use roadside_location::MapProvider;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "roadside-cli")]
#[command(about = "Roadside assistance request tooling")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode and build map share links
    Location {
        #[command(subcommand)]
        command: LocationCommands,
    },
    /// Submit an assistance request directly to the database
    Submit {
        /// tow, battery_jump, flat_tire, fuel_delivery or minor_repair
        #[arg(long)]
        service: ServiceType,
        /// Caller phone with country code, e.g. +9613123456
        #[arg(long)]
        phone: String,
        /// Google Maps link to the caller's position
        #[arg(long)]
        location: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Inspect and update stored requests
    Requests {
        #[command(subcommand)]
        command: RequestsCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum LocationCommands {
    /// Print the coordinates and zoom carried by a map link
    Decode { link: String },
    /// Build a share link for a coordinate pair
    Encode {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, default_value_t = 16)]
        zoom: i64,
        /// primary or open-map
        #[arg(long, default_value = "primary")]
        provider: MapProvider,
    },
}

#[derive(Debug, Subcommand)]
enum RequestsCommands {
    /// List requests, newest first
    List {
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Move a request to a new status
    SetStatus {
        id: Uuid,
        status: RequestStatus,
        /// Provider to assign; required when moving to `assigned`
        #[arg(long)]
        provider_id: Option<Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("ROADSIDE_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("roadside-cli: run with --help to see available commands");
        return Ok(());
    };

    match command {
        Commands::Location {
            command: LocationCommands::Decode { link },
        } => location::run_decode(&link),
        Commands::Location {
            command:
                LocationCommands::Encode {
                    lat,
                    lng,
                    zoom,
                    provider,
                },
        } => location::run_encode(lat, lng, zoom, provider),
        Commands::Submit {
            service,
            phone,
            location,
            notes,
        } => {
            let pool = connect().await?;
            requests::run_submit(&pool, service, phone, location, notes).await
        }
        Commands::Requests {
            command: RequestsCommands::List { status, limit },
        } => {
            let pool = connect().await?;
            requests::run_list(&pool, status, limit).await
        }
        Commands::Requests {
            command:
                RequestsCommands::SetStatus {
                    id,
                    status,
                    provider_id,
                },
        } => {
            let pool = connect().await?;
            requests::run_set_status(&pool, id, status, provider_id).await
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            let pool = connect().await?;
            roadside_db::ping(&pool).await?;
            println!("database ok");
            Ok(())
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let pool = connect().await?;
            let applied = roadside_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
    }
}

/// Load config and open a pool; only the database-backed commands need it.
async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = roadside_core::load_app_config()?;
    let pool_config = roadside_db::PoolConfig::from_app_config(&config);
    let pool = roadside_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}
