use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use elimubuddy::config::ConfigError;
use elimubuddy::language::UnknownLanguage;
use elimubuddy::{
    ApiError, ClientConfig, FileStore, HttpAuthApi, KeyValueStore, Language, LanguagePreference, LogNavigator,
    SessionError, SessionManager, StorageError,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Language(#[from] UnknownLanguage),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("registration payload must be a JSON object")]
    PayloadNotObject,
    #[error("token refresh failed; session cleared")]
    RefreshFailed,
}

#[derive(Parser, Debug)]
#[command(name = "elimubuddy", about = "ElimuBuddy session client")]
struct Cli {
    /// Backend base URL, e.g. `http://localhost:5000/api`.
    #[arg(long, env = "ELIMU_API_URL")]
    base_url: Option<String>,

    /// Session store file.
    #[arg(long, env = "ELIMU_STORE_PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show who is signed in.
    Status,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ELIMU_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        /// Registration form as a JSON object.
        #[arg(long)]
        data: String,
    },
    Refresh,
    Logout,
    /// Authenticated GET against the backend, refreshing the token on 401.
    Fetch { path: String },
    /// Show or set the UI language (`en` or `sw`).
    Language { code: Option<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    tracing::debug!(api_url = %config.api_url, store = %config.store_path.display(), "config loaded");

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.store_path));

    if let Command::Language { code } = &cli.command {
        return run_language(store, code.as_deref());
    }

    let api = Arc::new(HttpAuthApi::new(&config.api_url, config.timeouts)?);
    let manager = SessionManager::new(api.clone(), store, Arc::new(LogNavigator));
    manager.initialize();

    match cli.command {
        Command::Status => {
            print_status(&manager);
            Ok(())
        }
        Command::Login { email, password } => {
            manager.login(&email, &password).await?;
            print_status(&manager);
            Ok(())
        }
        Command::Register { data } => {
            let payload: serde_json::Value = serde_json::from_str(&data)?;
            if !payload.is_object() {
                return Err(CliError::PayloadNotObject);
            }
            manager.register(&payload).await?;
            println!("registered; log in to continue");
            Ok(())
        }
        Command::Refresh => {
            if !manager.refresh_access_token().await {
                return Err(CliError::RefreshFailed);
            }
            println!("access token refreshed");
            Ok(())
        }
        Command::Logout => {
            manager.logout();
            println!("logged out");
            Ok(())
        }
        Command::Fetch { path } => {
            let api = api.as_ref();
            let path = path.as_str();
            let body = manager
                .authorized(|token| async move { api.get_json(path, &token).await })
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Command::Language { .. } => Ok(()),
    }
}

fn run_language(store: Arc<dyn KeyValueStore>, code: Option<&str>) -> Result<(), CliError> {
    let preference = LanguagePreference::new(store);
    if let Some(code) = code {
        let language: Language = code.parse()?;
        preference.store(language)?;
    }
    println!("{}", preference.load());
    Ok(())
}

fn print_status(manager: &SessionManager) {
    let session = manager.snapshot();
    if !session.is_authenticated() {
        println!("not signed in");
        return;
    }
    match &session.user {
        Some(user) => println!("signed in as {} <{}> ({})", user.display_name(), user.email, user.role),
        None => println!("signed in (no profile stored)"),
    }
    if let Some(info) = session.user.as_ref().and_then(|u| u.student_info.as_ref()) {
        println!("  {} at {}", info.grade, info.school);
    }
}
