//! Hostname normalization, reachability probing and persistence
//!
//! A server counts as reachable when any probe path answers with a status
//! in [200, 500), including 401/403. Each probe tries HEAD first and falls
//! back to GET; if nothing answers over https the same probes are repeated
//! over plain http.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::race::{race_against_timer, Raced};
use crate::constants::{api, hostname, http};
use crate::errors::{AuthError, AuthResult, SettingsResult};
use crate::settings::SettingsProvider;

/// Probe timing and TLS configuration
#[derive(Debug, Clone)]
pub struct HostnameConfig {
    /// Timeout for each individual probe
    pub probe_timeout: Duration,
    /// Whole validation is abandoned after this long
    pub validation_timeout: Duration,
    /// Accept untrusted certificates while probing
    pub accept_invalid_certs: bool,
}

impl Default for HostnameConfig {
    fn default() -> Self {
        Self {
            probe_timeout: hostname::PROBE_TIMEOUT,
            validation_timeout: hostname::VALIDATION_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

/// Turn user input into a base URL: scheme defaults to https, trailing
/// slashes are removed and the API prefix is appended once
///
/// Returns `None` for blank input.
pub fn normalize_hostname(input: &str) -> Option<String> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    if with_scheme.ends_with(api::API_PREFIX) {
        Some(with_scheme)
    } else {
        Some(format!("{}{}", with_scheme, api::API_PREFIX))
    }
}

/// Validates and stores the server base URL
#[derive(Clone)]
pub struct HostnameService {
    settings: Arc<dyn SettingsProvider>,
    config: HostnameConfig,
}

impl std::fmt::Debug for HostnameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostnameService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HostnameService {
    /// Create a service writing to the given settings provider
    pub fn new(settings: Arc<dyn SettingsProvider>, config: HostnameConfig) -> Self {
        Self { settings, config }
    }

    /// Whether a server answers at `base_url`
    ///
    /// Never fails; unparseable URLs and network errors count as unreachable.
    pub async fn validate(&self, base_url: &str, api_key: Option<&str>) -> bool {
        let Some(base) = parse_base(base_url) else {
            warn!("Not a valid URL: {}", base_url);
            return false;
        };

        let secure = match self.build_client(api_key, self.config.accept_invalid_certs) {
            Ok(client) => client,
            Err(e) => {
                warn!("Cannot build probe client: {}", e);
                return false;
            }
        };
        if self.probe_all(&secure, &base).await {
            return true;
        }

        if base.scheme() == "https" {
            let mut plain = base.clone();
            if plain.set_scheme("http").is_ok() {
                debug!("No answer over https, retrying {} over http", plain);
                if let Ok(client) = self.build_client(api_key, false) {
                    return self.probe_all(&client, &plain).await;
                }
            }
        }

        false
    }

    /// [`validate`](Self::validate) raced against the validation timeout
    pub async fn validate_with_timeout(&self, base_url: &str, api_key: Option<&str>) -> bool {
        let service = self.clone();
        let base_url = base_url.to_string();
        let api_key = api_key.map(str::to_string);

        match race_against_timer(
            "hostname validation",
            self.config.validation_timeout,
            async move { service.validate(&base_url, api_key.as_deref()).await },
        )
        .await
        {
            Raced::Completed(reachable) => reachable,
            Raced::TimedOut => {
                warn!(
                    "Hostname validation timed out after {:?}",
                    self.config.validation_timeout
                );
                false
            }
        }
    }

    /// Persist a base URL with trailing slashes removed
    pub async fn set_hostname(&self, base_url: &str) -> SettingsResult<()> {
        let mut settings = self.settings.load().await?;
        settings.set_base_url(base_url);
        self.settings.save(&settings).await?;
        info!("Server set to {}", settings.base_url);
        Ok(())
    }

    /// Normalize, validate with timeout, then persist
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - blank hostname
    /// * `AuthError::UnreachableHost` - no probe answered in time
    /// * `AuthError::Settings` - the base URL could not be saved
    pub async fn configure(&self, input: &str) -> AuthResult<String> {
        let base_url = normalize_hostname(input).ok_or_else(|| AuthError::InvalidInput {
            reason: "hostname is empty".to_string(),
        })?;

        let api_key = self.settings.load().await?.api_key().map(str::to_string);
        if !self
            .validate_with_timeout(&base_url, api_key.as_deref())
            .await
        {
            return Err(AuthError::UnreachableHost { base_url });
        }

        self.set_hostname(&base_url).await?;
        Ok(base_url)
    }

    fn build_client(&self, api_key: Option<&str>, insecure: bool) -> reqwest::Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(hostname::PROBE_ACCEPT));
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            if let Ok(mut value) = HeaderValue::from_str(key.trim()) {
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static("x-api-key"), value);
            }
        }

        Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(self.config.probe_timeout)
            .user_agent(http::USER_AGENT)
            .default_headers(headers)
            .build()
    }

    async fn probe_all(&self, client: &Client, base: &Url) -> bool {
        for url in probe_urls(base) {
            if let Some(status) = probe(client, &url).await {
                if (200..500).contains(&status) {
                    info!("Server answered {} with HTTP {}", url, status);
                    return true;
                }
                debug!("Probe {} returned HTTP {}", url, status);
            }
        }
        false
    }
}

fn parse_base(base_url: &str) -> Option<Url> {
    let mut url = Url::parse(base_url.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url)
}

/// Probe URLs relative to the base, then relative to the origin
fn probe_urls(base: &Url) -> Vec<Url> {
    let mut urls: Vec<Url> = Vec::new();
    let mut origin = base.clone();
    origin.set_path("/");

    for root in [base, &origin] {
        for path in hostname::PROBE_PATHS {
            if let Ok(url) = root.join(path) {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
    }
    urls
}

async fn probe(client: &Client, url: &Url) -> Option<u16> {
    match client.request(Method::HEAD, url.clone()).send().await {
        Ok(response) => Some(response.status().as_u16()),
        Err(e) => {
            debug!("HEAD {} failed ({}), trying GET", url, e);
            client
                .get(url.clone())
                .send()
                .await
                .ok()
                .map(|r| r.status().as_u16())
        }
    }
}
