mod config;
mod logging;
mod model;
mod ports;
mod services;
mod session;
mod tidal_rs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, bail},
};

use crate::{
    config::Config,
    logging::init_tracing,
    services::collection::{CollectionService, FetchOptions},
    services::predicate::Rule,
    services::reconcile::{ReconcileOptions, ReconcileService},
    session::{SessionState, StoredSession},
    tidal_rs::auth,
    tidal_rs::client::TidalClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "TIDAL_CURATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info", global = true, env = "TIDAL_CURATOR_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in to Tidal with the device flow and save the session
    Login {
        /// Tidal API client id
        #[arg(long, env = "TIDAL_CLIENT_ID")]
        client_id: String,

        /// Tidal API client secret, if the client has one
        #[arg(long, env = "TIDAL_CLIENT_SECRET")]
        client_secret: Option<String>,
    },
    /// Show the state of the saved session
    Session,
    /// Reconcile a managed playlist with its membership predicate
    Sync {
        /// Which predicate drives the managed playlist
        #[arg(short, long, value_enum)]
        rule: Rule,

        /// Override the managed playlist name from the config
        #[arg(long)]
        playlist_name: Option<String>,

        /// Tidal API client id, needed to refresh an expired session
        #[arg(long, env = "TIDAL_CLIENT_ID")]
        client_id: Option<String>,

        /// Tidal API client secret, if the client has one
        #[arg(long, env = "TIDAL_CLIENT_SECRET")]
        client_secret: Option<String>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = {
        if let Some(config) = args.config {
            Config::from_file(&config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load tidal-curator config")?;

    match args.command {
        Commands::Login {
            client_id,
            client_secret,
        } => {
            login(&config, &client_id, client_secret.as_deref()).await?;
        }
        Commands::Session => match SessionState::probe(&config.session_file_path()) {
            SessionState::Valid(_) => println!("Session is valid."),
            SessionState::Expired(_) => {
                println!("Session is expired; it will be refreshed on the next sync.")
            }
            SessionState::Missing => println!("No saved session. Run `tidal-curator login`."),
        },
        Commands::Sync {
            rule,
            playlist_name,
            client_id,
            client_secret,
        } => {
            sync(
                &config,
                rule,
                playlist_name,
                client_id.as_deref(),
                client_secret.as_deref(),
            )
            .await?;
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}

async fn login(config: &Config, client_id: &str, client_secret: Option<&str>) -> Result<()> {
    let http = reqwest::Client::new();

    let grant = auth::request_device_authorization(&http, client_id).await?;
    let link = grant
        .verification_uri_complete
        .clone()
        .unwrap_or_else(|| grant.verification_uri.clone());
    println!(
        "Visit https://{} to authorize this device (code: {})",
        link, grant.user_code
    );

    let token = auth::poll_for_token(&http, client_id, client_secret, &grant).await?;
    let session = StoredSession::from_token(&token, None)?;

    let path = config.session_file_path();
    session.save(&path)?;
    tracing::info!(path = %path.display(), "session saved");
    Ok(())
}

/// Resolve a usable session, refreshing an expired one when API credentials
/// are at hand. Re-authentication is never done here; that is `login`'s job.
async fn resolve_session(
    config: &Config,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<StoredSession> {
    let path = config.session_file_path();
    match SessionState::probe(&path) {
        SessionState::Valid(session) => Ok(session),
        SessionState::Missing => {
            bail!("No saved session. Run `tidal-curator login` first.")
        }
        SessionState::Expired(session) => {
            let client_id = client_id.ok_or_eyre(
                "Session expired; pass --client-id (or set TIDAL_CLIENT_ID) to refresh it",
            )?;
            tracing::info!("access token expired, refreshing");

            let http = reqwest::Client::new();
            let token =
                auth::refresh_token(&http, client_id, client_secret, &session.refresh_token)
                    .await?;
            let refreshed = StoredSession::from_token(&token, Some(&session.refresh_token))?;
            refreshed.save(&path)?;
            Ok(refreshed)
        }
    }
}

async fn sync(
    config: &Config,
    rule: Rule,
    playlist_override: Option<String>,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<()> {
    let session = resolve_session(config, client_id, client_secret).await?;
    let client = TidalClient::connect(session.access_token).await?;

    let managed_config = config.playlist_for(rule).clone();
    let playlist_name = playlist_override.unwrap_or(managed_config.name);

    let collections = CollectionService::new(
        &client,
        FetchOptions {
            page_size: config.page_size(),
            page_pause: config.page_pause(),
            page_retries: config.page_retries(),
        },
    );

    // All fetching happens before any mutation: an incomplete source set must
    // never drive removals.
    let (playlist_union, managed) = collections.playlist_union(&playlist_name).await?;
    let favorites = collections.fetch_favorites().await?;
    tracing::info!(
        favorites = favorites.len(),
        in_playlists = playlist_union.len(),
        "collections fetched"
    );

    let desired = rule.evaluate(&favorites, &playlist_union);
    tracing::info!(desired = desired.len(), ?rule, "desired membership computed");

    let reconciler = ReconcileService::new(
        &client,
        &client,
        ReconcileOptions {
            playlist_name: playlist_name.clone(),
            playlist_description: managed_config.description,
            batch_limit: config.batch_size(),
        },
    );
    let report = reconciler.reconcile(managed, &desired).await?;

    if report.changed() {
        println!(
            "'{}' updated: {} added, {} removed ({} tracks total).",
            playlist_name,
            report.added,
            report.removed,
            desired.len()
        );
    } else {
        println!("'{}' is already up to date.", playlist_name);
    }
    if report.failed() > 0 {
        println!(
            "{} mutations failed; re-run to retry them.",
            report.failed()
        );
    }

    Ok(())
}
