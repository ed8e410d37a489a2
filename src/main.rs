use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

mod application;
mod domain;
mod infrastructure;
mod plugins;

use application::errors::AppError;
use application::services::{Catalog, CatalogService, ConnectionService, LinkRequest};
use domain::entities::ConnectionStatus;
use infrastructure::api::{self, AppState};
use infrastructure::config::Config;
use infrastructure::crypto::CredentialCipher;
use infrastructure::database::Database;
use infrastructure::llm::ClaudeProvider;
use infrastructure::storage::{share, SharedDatabase, SqliteStore};
use plugins::{McpManager, PluginRegistry};

#[derive(Parser)]
#[command(name = "mcps")]
#[command(about = "Connect marketing data providers and query them through Claude", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Database path (overrides config)
    #[arg(long)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the read-only provider API
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Send a message to Claude with the user's connected data sources
    Chat {
        #[arg(short, long)]
        user: String,
        message: String,
        /// Session id echoed back in the reply
        #[arg(short, long)]
        session: Option<String>,
    },
    /// List providers
    Providers {
        /// Only providers of this category slug
        #[arg(long)]
        category: Option<String>,
    },
    /// Load categories and providers (built-in catalog unless a YAML file is given)
    Seed {
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Link a user to a provider
    Connect {
        #[arg(short, long)]
        user: String,
        /// Provider slug
        #[arg(short, long)]
        provider: String,
        /// Credentials as JSON, or @path to a JSON file
        #[arg(long)]
        credentials: String,
        /// Connection config as JSON
        #[arg(long)]
        settings: Option<String>,
        /// Display name distinguishing several accounts of one provider
        #[arg(long, default_value = "")]
        name: String,
        /// Seconds until the access token expires
        #[arg(long)]
        expires_in: Option<i64>,
        /// Seconds between syncs
        #[arg(long)]
        sync_frequency: Option<i64>,
    },
    /// Replace a connection's credentials and reactivate it
    Reauthorize {
        id: Uuid,
        /// Credentials as JSON, or @path to a JSON file
        #[arg(long)]
        credentials: String,
        /// Seconds until the access token expires
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Remove a connection
    Disconnect { id: Uuid },
    /// Change a connection's status (active, expired, error, disabled)
    SetStatus { id: Uuid, status: ConnectionStatus },
    /// List a user's connections
    Connections {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        status: Option<ConnectionStatus>,
    },
    /// Generate a credential encryption key
    GenKey,
    /// Generate default config
    InitConfig,
    /// Show version
    Version,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Version => {
            println!("mcps v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::GenKey => {
            println!("{}", CredentialCipher::generate_key());
            Ok(())
        }
        command => {
            let mut config = load_config(&cli.config);
            if let Some(path) = cli.database {
                config.database.path = path.into();
            }
            run_with_config(command, config)
        }
    }
}

fn load_config(path: &str) -> Config {
    if Path::new(path).exists() {
        Config::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn open_database(config: &Config) -> Result<SharedDatabase, AppError> {
    let db = Database::new(&config.database.path)?;
    tracing::debug!("Database opened at {}", config.database.path.display());
    Ok(share(db))
}

fn cipher(config: &Config) -> Result<Arc<CredentialCipher>, AppError> {
    Ok(Arc::new(CredentialCipher::from_config(&config.security)?))
}

fn runtime() -> Result<tokio::runtime::Runtime, AppError> {
    tokio::runtime::Runtime::new().map_err(|e| AppError::Internal(format!("tokio runtime: {}", e)))
}

fn run_with_config(command: Commands, config: Config) -> Result<(), AppError> {
    let db = open_database(&config)?;

    match command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = AppState {
                catalog: CatalogService::new(db),
            };
            runtime()?.block_on(api::serve(&bind, state))
        }
        Commands::Chat { user, message, session } => {
            let session = session.unwrap_or_else(|| Uuid::new_v4().to_string());
            chat(&config, db, &user, &message, &session)
        }
        Commands::Providers { category } => {
            let providers = CatalogService::new(db).list_providers(category.as_deref())?;
            if providers.is_empty() {
                println!("No providers. Run `mcps seed` first.");
            }
            for p in providers {
                println!(
                    "{:<24} {:<22} {:<12} {:<10} {}",
                    p.slug,
                    p.name,
                    p.category.slug,
                    p.integration_type.as_str(),
                    p.plugin_class
                );
            }
            Ok(())
        }
        Commands::Seed { file } => {
            let catalog = match file {
                Some(path) => Catalog::load(path)?,
                None => Catalog::builtin(),
            };
            let summary = CatalogService::new(db).seed(&catalog)?;
            println!("Seeded {} categories and {} providers", summary.categories, summary.providers);
            Ok(())
        }
        Commands::Connect {
            user,
            provider,
            credentials,
            settings,
            name,
            expires_in,
            sync_frequency,
        } => {
            let request = LinkRequest {
                display_name: name,
                credentials: read_json(&credentials)?,
                config: settings.as_deref().map(read_json).transpose()?.unwrap_or(Value::Null),
                sync_frequency,
                expires_at: expires_in.map(|s| chrono::Utc::now() + chrono::Duration::seconds(s)),
            };
            let connection = ConnectionService::new(db, cipher(&config)?).link(&user, &provider, request)?;
            println!("{}", connection.id);
            Ok(())
        }
        Commands::Reauthorize { id, credentials, expires_in } => {
            let credentials = read_json(&credentials)?;
            let expires_at = expires_in.map(|s| chrono::Utc::now() + chrono::Duration::seconds(s));
            let pc = ConnectionService::new(db, cipher(&config)?).reauthorize(id, &credentials, expires_at)?;
            println!("{} ({}) is active again", id, pc.slug());
            Ok(())
        }
        Commands::Disconnect { id } => {
            ConnectionService::new(db, cipher(&config)?).disconnect(id)?;
            println!("Removed {}", id);
            Ok(())
        }
        Commands::SetStatus { id, status } => {
            ConnectionService::new(db, cipher(&config)?).set_status(id, status)?;
            println!("{} is now {}", id, status);
            Ok(())
        }
        Commands::Connections { user, status } => {
            let connections = ConnectionService::new(db, cipher(&config)?).list(&user, status)?;
            let now = chrono::Utc::now();
            for pc in connections {
                let c = &pc.connection;
                println!(
                    "{}  {:<24} {:<9} {:<16} last sync: {}{}",
                    c.id,
                    pc.provider.slug,
                    c.status.as_str(),
                    if c.display_name.is_empty() { "-" } else { c.display_name.as_str() },
                    c.last_sync.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string()),
                    if c.is_active() && c.is_sync_due(now) { " (sync due)" } else { "" }
                );
            }
            Ok(())
        }
        Commands::Version | Commands::InitConfig | Commands::GenKey => Ok(()),
    }
}

fn chat(config: &Config, db: SharedDatabase, user: &str, message: &str, session: &str) -> Result<(), AppError> {
    let cipher = cipher(config)?;
    let llm = Arc::new(ClaudeProvider::from_config(&config.llm)?);
    let store = Arc::new(SqliteStore::new(db));
    let registry = Arc::new(PluginRegistry::with_builtin());

    runtime()?.block_on(async {
        let mut manager = McpManager::load(user, store, registry, cipher, llm, config.llm.clone()).await?;
        manager.initialize_plugins().await;
        tracing::info!("Active plugins: {:?}", manager.active_slugs());

        let reply = manager.execute_claude_request(message, session).await?;
        let json = serde_json::to_string_pretty(&reply).map_err(|e| AppError::Internal(e.to_string()))?;
        println!("{}", json);
        Ok(())
    })
}

/// Inline JSON, or `@path` to a JSON file
fn read_json(arg: &str) -> Result<Value, AppError> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AppError::InvalidInput(format!("cannot read {}: {}", path, e)))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| AppError::InvalidInput(format!("invalid JSON: {}", e)))
}

fn init_config() -> Result<(), AppError> {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).map_err(|e| AppError::Internal(e.to_string()))?;
    println!("{}", yaml);
    println!("# Save this to config.yaml and adjust as needed.");
    println!("# Generate security.secret-key with `mcps gen-key`.");
    Ok(())
}
