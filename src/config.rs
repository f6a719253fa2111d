use std::{env, net::SocketAddr};

use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub api_base_url: Option<Url>,
    pub auth_base_url: Option<Url>,
    pub places_base_url: Option<Url>,
    pub cookie_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let api_base_url = optional_url("API_BASE_URL")?;
        let auth_base_url = optional_url("AUTH_BASE_URL")?;
        let places_base_url = optional_url("PLACES_BASE_URL")?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-wanderlog-cookie-secret".to_string());

        Ok(Self {
            listen_addr,
            api_base_url,
            auth_base_url,
            places_base_url,
            cookie_secret,
        })
    }
}

fn optional_url(key: &str) -> Result<Option<Url>, AppError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_base_url(raw.trim())
            .map(Some)
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        _ => Ok(None),
    }
}

/// Parses a base URL and makes sure its path ends in `/`, so relative joins
/// append to it instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_its_prefix_on_join() {
        let base = parse_base_url("https://api.example.com/v1").unwrap();
        assert_eq!(
            base.join("trips/7").unwrap().as_str(),
            "https://api.example.com/v1/trips/7"
        );
    }
}
