// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use azlogin::config::{Command, Config};
use azlogin::error::{LoginError, StoreError, TokenError};
use azlogin::login::LoginService;

/// Exit code when the user interrupts the login (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<i32> {
    let store = config.token_store()?;
    debug!(path = %store.path().display(), "token store");
    let service = LoginService::with_system_browser(config.login_config(), store);

    match config.command {
        Command::Login { .. } => login(&service).await,
        Command::Token { json } => token(&service, json).await,
        Command::Status => status(&service),
        Command::Logout => {
            if service.logout()? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
            Ok(0)
        }
    }
}

async fn login(service: &LoginService) -> anyhow::Result<i32> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received SIGINT");
                cancel.cancel();
            }
        });
    }

    eprintln!("Opening the browser to log in to Azure...");
    match service.login(cancel).await {
        Ok(info) => {
            println!("Login Succeeded (tenant {})", info.tenant_id);
            Ok(0)
        }
        Err(LoginError::Cancelled) => {
            eprintln!("Login cancelled");
            Ok(EXIT_INTERRUPTED)
        }
        Err(e) => Err(e.into()),
    }
}

async fn token(service: &LoginService, json: bool) -> anyhow::Result<i32> {
    let bearer = match service.bearer_token().await {
        Ok(bearer) => bearer,
        Err(TokenError::Persist { credential, source }) => {
            // Still usable for this call; the next one refreshes again.
            eprintln!("warning: {:#}", anyhow::Error::new(source));
            credential.bearer()
        }
        Err(e) if e.is_not_logged_in() => {
            eprintln!("Not logged in. Run `azlogin login` first.");
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&bearer)?);
    } else {
        println!("{}", bearer.access_token);
    }
    Ok(0)
}

fn status(service: &LoginService) -> anyhow::Result<i32> {
    let status = match service.status() {
        Ok(status) => status,
        Err(StoreError::NotLoggedIn) => {
            println!("Not logged in");
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Tenant:     {}", status.tenant_id);
    if status.valid {
        println!("Token:      valid for {}s", status.expires_in_secs);
    } else {
        println!("Token:      expired (refreshed on next use)");
    }
    Ok(0)
}
