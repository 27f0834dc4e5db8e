//! c4connect - log in to a Carrefour account once and reuse the session.
//!
//! The stored session (the provider's cookies) is kept encrypted in the
//! cache directory, one vault per account. Each `login` run first tries to reuse it and only sends
//! credentials when it is no longer valid.

use std::io;

use anyhow::{anyhow, Context, Result};
use c4connect_core::api::{AuthError, HttpClient};
use c4connect_core::auth::{AuthenticationOutcome, Authenticator, CredentialStore, Credentials, SessionSource};
use c4connect_core::cookies::{CookieStore, CookieVault, SessionStore};
use c4connect_core::Config;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "c4connect", version, about = "CarrefourConnect session manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ensure an authenticated session, reusing the stored one when valid
    Login {
        /// Account e-mail (defaults to the last one used)
        #[arg(long, env = "C4CONNECT_LOGIN")]
        login: Option<String>,

        /// Account password (otherwise read from the keychain or prompted)
        #[arg(long, env = "C4CONNECT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Remember the password in the OS keychain after a successful login
        #[arg(long)]
        remember: bool,

        /// Do not persist the session cookies
        #[arg(long)]
        no_save: bool,
    },
    /// Delete the stored session
    Logout {
        /// Also remove the password from the keychain
        #[arg(long)]
        forget: bool,
    },
    /// Show whether a stored session exists
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Login {
            login,
            password,
            remember,
            no_save,
        } => run_login(&mut config, login, password, remember, no_save).await,
        Command::Logout { forget } => run_logout(&config, forget),
        Command::Status => run_status(&config),
    }
}

/// Vault of the account last logged in, if any.
fn last_vault(config: &Config) -> Result<Option<CookieVault>> {
    match &config.last_login {
        Some(login) => Ok(Some(CookieVault::for_login(&config.cache_dir()?, login))),
        None => Ok(None),
    }
}

fn resolve_credentials(
    config: &Config,
    login: Option<String>,
    password: Option<String>,
) -> Result<(Credentials, bool)> {
    let login = match login.or_else(|| config.last_login.clone()) {
        Some(login) if !login.trim().is_empty() => login.trim().to_string(),
        _ => return Err(anyhow!("No login given; pass --login or set C4CONNECT_LOGIN")),
    };

    // The bool tells whether the password came from the keychain
    let (password, from_keychain) = match password {
        Some(password) => (password, false),
        None if CredentialStore::has_credentials(&login) => (CredentialStore::get_password(&login)?, true),
        None => (rpassword::prompt_password(format!("Password for {}: ", login))?, false),
    };

    Ok((Credentials::new(login, password), from_keychain))
}

async fn run_login(
    config: &mut Config,
    login: Option<String>,
    password: Option<String>,
    remember: bool,
    no_save: bool,
) -> Result<()> {
    let (credentials, from_keychain) = resolve_credentials(config, login, password)?;
    let vault = CookieVault::for_login(&config.cache_dir()?, &credentials.login);

    let cookies = match vault.load(&credentials.password) {
        Ok(Some(cookies)) => cookies,
        Ok(None) => CookieStore::new(),
        Err(e) => {
            warn!(error = %e, "Failed to load stored session");
            CookieStore::new()
        }
    };

    let http = HttpClient::new(config.request_timeout_secs)?;
    let mut authenticator = Authenticator::new(http, cookies, config.endpoints());

    match authenticator.ensure_authenticated(&credentials).await {
        AuthenticationOutcome::Authenticated(source) => {
            if !no_save {
                vault.save(authenticator.cookies(), &credentials.password)?;
            }
            if remember && !from_keychain {
                CredentialStore::store(&credentials.login, &credentials.password)?;
            }
            config.last_login = Some(credentials.login.clone());
            config.save()?;

            match source {
                SessionSource::Reused => println!("Stored session reused for {}", credentials.login),
                SessionSource::Fresh => println!("Logged in as {}", credentials.login),
            }
            info!(?source, "Authenticated");
            Ok(())
        }
        AuthenticationOutcome::Failed(AuthError::ChallengeAsked) => Err(anyhow!(
            "{}: the provider is blocking automated access; log in once from a browser and retry later",
            AuthError::ChallengeAsked
        )),
        AuthenticationOutcome::Failed(e) => Err(anyhow!("{}: authentication failed", e)),
    }
}

fn run_logout(config: &Config, forget: bool) -> Result<()> {
    match last_vault(config)? {
        Some(vault) => {
            vault.clear()?;
            println!("Stored session removed");
        }
        None => println!("No stored session"),
    }

    if forget {
        if let Some(ref login) = config.last_login {
            if CredentialStore::has_credentials(login) {
                CredentialStore::delete(login)?;
                println!("Password for {} removed from keychain", login);
            }
        }
    }
    Ok(())
}

fn run_status(config: &Config) -> Result<()> {
    match &config.last_login {
        Some(login) => println!("Account: {}", login),
        None => println!("Account: (none)"),
    }
    let saved_at = match last_vault(config)? {
        Some(vault) => vault.saved_at()?,
        None => None,
    };
    match saved_at {
        Some(saved_at) => println!(
            "Stored session: saved {}",
            saved_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("Stored session: none"),
    }
    Ok(())
}
