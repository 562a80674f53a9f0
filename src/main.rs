use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sessiongate::config::ConfigError;
use sessiongate::provider::gotrue::GoTrueClient;
use sessiongate::provider::refresh::{interval_from_env, spawn_auto_refresh};
use sessiongate::provider::storage::FileStorage;
use sessiongate::provider::ProviderError;
use sessiongate::{AuthError, CommandOutcome, Credentials, ProviderConfig, SessionState, SessionStore, StoreConfig};

/// How long `login`/`register` wait for the provider's `SIGNED_IN` event.
const SIGNED_IN_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("provider client setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("{0}")]
    Input(AuthError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sessiongate", about = "Email/password session client for a Supabase project")]
struct Cli {
    #[arg(long, env = "SESSIONGATE_STORAGE_PATH", default_value = ".sessiongate/session.json")]
    storage_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the stored session and print the snapshot.
    Status,
    /// Sign in with email and password.
    Login(CredentialArgs),
    /// Create an account.
    Register(CredentialArgs),
    /// Sign out and forget the stored session.
    Logout,
    /// Print every state change until Ctrl-C, refreshing the session as it nears expiry.
    Watch,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "SESSIONGATE_EMAIL")]
    email: String,

    #[arg(long, env = "SESSIONGATE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Serialize)]
struct CommandReport<'a> {
    #[serde(flatten)]
    outcome: CommandOutcome,
    state: &'a SessionState,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ProviderConfig::from_env()?;
    let storage = Arc::new(FileStorage::new(cli.storage_path));
    let client = Arc::new(GoTrueClient::new(config, storage)?);
    let store = SessionStore::start(client.clone(), StoreConfig::from_env()).await;

    match cli.command {
        Command::Status => run_status(&store).await,
        Command::Login(args) => {
            let credentials = Credentials::parse(&args.email, &args.password).map_err(CliError::Input)?;
            let result = store.login(&credentials.email, &credentials.password).await;
            report(&store, result).await
        }
        Command::Register(args) => {
            let credentials = Credentials::parse(&args.email, &args.password).map_err(CliError::Input)?;
            let result = store.register(&credentials.email, &credentials.password).await;
            report(&store, result).await
        }
        Command::Logout => {
            store.logout().await;
            print_json(&store.state())
        }
        Command::Watch => run_watch(&store, client).await,
    }
}

async fn run_status(store: &SessionStore) -> Result<(), CliError> {
    store.bootstrap().await;
    print_json(&store.state())
}

/// Print the command outcome alongside the resulting snapshot. On success,
/// give the bridge a moment to publish the signed-in user first.
async fn report(store: &SessionStore, result: Result<(), AuthError>) -> Result<(), CliError> {
    if result.is_ok() {
        let mut rx = store.subscribe();
        if tokio::time::timeout(SIGNED_IN_WAIT, rx.wait_for(SessionState::is_logged_in))
            .await
            .is_err()
        {
            tracing::warn!("provider accepted the request but no session was published");
        }
    }
    let state = store.state();
    print_json(&CommandReport { outcome: CommandOutcome::from(result), state: &state })
}

async fn run_watch(store: &SessionStore, client: Arc<GoTrueClient>) -> Result<(), CliError> {
    let refresh = interval_from_env().map(|interval| spawn_auto_refresh(client, interval));
    let mut rx = store.subscribe();
    store.bootstrap().await;
    print_json(&*rx.borrow_and_update())?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_json(&*rx.borrow_and_update())?;
            }
            signal = &mut ctrl_c => {
                signal?;
                tracing::info!("interrupted, stopping watch");
                break;
            }
        }
    }

    if let Some(handle) = refresh {
        handle.abort();
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
