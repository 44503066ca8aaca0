//! Startup validation and interactive setup
//!
//! This module checks whether the client is ready to submit files and, when
//! it is not, walks the user through choosing a server and supplying
//! credentials. Prompts can be pre-filled from `SANITIZE_*` environment
//! variables (or a `.env` file).

use std::env;
use std::io::{self, BufRead, Write};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::{AuthService, HostnameService};
use crate::constants::env as env_vars;
use crate::errors::{AppError, Result};
use crate::settings::{Settings, SettingsProvider};

/// Startup readiness status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupStatus {
    /// Configured server base URL, if any
    pub base_url: Option<String>,
    /// A bearer token is stored and not past its estimated expiry
    pub session_active: bool,
    /// An integration API key is stored
    pub api_key_configured: bool,
}

impl StartupStatus {
    /// Derive readiness from persisted settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings
                .has_base_url()
                .then(|| settings.normalized_base_url().to_string()),
            session_active: settings.bearer_token().is_some()
                && !settings.token_expired(Utc::now()),
            api_key_configured: settings.api_key().is_some(),
        }
    }

    /// Files can be submitted: a server and an API key are configured
    pub fn is_ready(&self) -> bool {
        self.base_url.is_some() && self.api_key_configured
    }

    /// Get a summary of what's missing
    pub fn summary(&self) -> String {
        if self.is_ready() {
            return "All systems ready for sanitization".to_string();
        }

        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push("server address");
        }
        if !self.api_key_configured {
            missing.push("API key");
        }
        format!("Setup required: {}", missing.join(", "))
    }
}

/// Load settings and report readiness
pub async fn check_startup(settings: &dyn SettingsProvider) -> Result<StartupStatus> {
    let loaded = settings.load().await?;
    let status = StartupStatus::from_settings(&loaded);
    debug!("Startup status: {:?}", status);
    Ok(status)
}

/// Print the startup status
pub fn show_startup_status(status: &StartupStatus) {
    println!();
    println!("🧼 Sanitize Client Status");
    println!("========================");
    println!();

    match &status.base_url {
        Some(url) => println!("🌐 Server:   ✅ {}", url),
        None => {
            println!("🌐 Server:   ❌ Not configured");
            println!("   Run: sanitize_client hostname <HOST>");
        }
    }

    if status.session_active {
        println!("🔐 Session:  ✅ Signed in");
    } else {
        println!("🔐 Session:  ➖ Not signed in");
    }

    if status.api_key_configured {
        println!("🔑 API key:  ✅ Configured");
    } else {
        println!("🔑 API key:  ❌ Not configured");
        println!("   Run: sanitize_client api-key");
    }

    println!();
    println!("Overall: {}", status.summary());
    println!();
}

/// Walk the user through whatever setup is missing
///
/// Asks for a server address first, then for an API key, then offers an
/// optional username/password sign-in.
pub async fn interactive_setup(
    settings: &dyn SettingsProvider,
    hostnames: &HostnameService,
    auth: &AuthService,
) -> Result<StartupStatus> {
    let mut status = check_startup(settings).await?;

    while status.base_url.is_none() {
        let input = prompt_line("Sanitization server (host or URL): ", None)?;
        if input.is_empty() {
            return Err(AppError::generic("A server address is required"));
        }
        match hostnames.configure(&input).await {
            Ok(base_url) => {
                println!("✅ Server set to {}", base_url);
                status = check_startup(settings).await?;
            }
            Err(e) => {
                warn!("Hostname setup failed: {}", e);
                println!("❌ {}", e);
            }
        }
    }

    if !status.api_key_configured {
        let key = prompt_secret("Integration API key: ", env_vars::API_KEY)?;
        if key.is_empty() {
            println!("⚠️  No API key entered. Uploads will fail until one is set.");
        } else {
            store_api_key(auth, &key).await?;
        }
    }

    if !status.session_active && confirm("Sign in with a username and password? [y/N]: ", false)? {
        let username = prompt_line("Username: ", Some(env_vars::USERNAME))?;
        let password = prompt_secret("Password: ", env_vars::PASSWORD)?;
        match auth.sign_in_with_timeout(&username, &password).await {
            Ok(_) => println!("✅ Signed in as {}", username),
            Err(e) => println!("❌ {}", e),
        }
    }

    check_startup(settings).await
}

/// Save an API key and report whether the server accepts it
pub async fn store_api_key(auth: &AuthService, key: &str) -> Result<bool> {
    auth.set_api_key(key).await?;
    let accepted = auth.validate_api_key().await;
    if accepted {
        info!("API key accepted by server");
        println!("✅ API key saved and accepted by the server");
    } else {
        warn!("API key was rejected or could not be checked");
        println!("⚠️  API key saved, but the server did not accept it");
    }
    Ok(accepted)
}

/// Prompt for a line of input, falling back to an environment variable
pub fn prompt_line(label: &str, env_var: Option<&str>) -> Result<String> {
    if let Some(value) = env_var.and_then(env_value) {
        debug!("Using {} from environment", env_var.unwrap_or_default());
        return Ok(value);
    }

    print!("{}", label);
    io::stdout().flush().map_err(AppError::Io)?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(AppError::Io)?;
    Ok(input.trim().to_string())
}

/// Prompt for a secret without echo, falling back to an environment variable
pub fn prompt_secret(label: &str, env_var: &str) -> Result<String> {
    if let Some(value) = env_value(env_var) {
        debug!("Using {} from environment", env_var);
        return Ok(value);
    }

    let secret = rpassword::prompt_password(label).map_err(AppError::Io)?;
    Ok(secret.trim().to_string())
}

fn confirm(label: &str, default: bool) -> Result<bool> {
    let answer = prompt_line(label, None)?;
    Ok(parse_yes_no(&answer, default))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Interpret a yes/no answer; anything unrecognized takes the default
pub fn parse_yes_no(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}
