//! Address autocomplete backed by an external place lookup service.
//!
//! The lookup service is health-checked once at startup. The outcome is published
//! through [`PlacesReadiness`]; views await it once and fall back to plain
//! text inputs when the service is unavailable.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use crate::models::destination::Coordinates;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// A candidate returned by the lookup service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceResult {
    pub formatted_address: String,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

impl PlaceResult {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Long name of the first component tagged with `kind`, e.g. `locality`.
    pub fn component(&self, kind: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|component| component.types.iter().any(|t| t == kind))
            .map(|component| component.long_name.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("place lookup is unavailable")]
    Unavailable,
    #[error("place lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid place lookup url: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait PlaceLookup: Send + Sync {
    async fn health_check(&self) -> Result<(), PlacesError>;

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceResult>, PlacesError>;
}

pub struct HttpPlaceLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPlaceLookup {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl PlaceLookup for HttpPlaceLookup {
    async fn health_check(&self) -> Result<(), PlacesError> {
        self.client
            .get(self.base_url.join("health")?)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceResult>, PlacesError> {
        let results = self
            .client
            .get(self.base_url.join("autocomplete")?)
            .query(&[("input", input)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<PlaceResult>>()
            .await?;
        Ok(results)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Pending,
    Ready,
    Unavailable(String),
}

/// Write half of the readiness signal. Resolving it consumes it, so the
/// state moves out of `Pending` at most once.
pub struct ReadinessSignal {
    tx: watch::Sender<ServiceState>,
}

impl ReadinessSignal {
    pub fn ready(self) {
        self.tx.send_replace(ServiceState::Ready);
    }

    pub fn unavailable(self, reason: impl Into<String>) {
        self.tx.send_replace(ServiceState::Unavailable(reason.into()));
    }
}

#[derive(Clone)]
pub struct PlacesReadiness {
    rx: watch::Receiver<ServiceState>,
}

impl PlacesReadiness {
    pub fn state(&self) -> ServiceState {
        self.rx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow() == ServiceState::Ready
    }

    /// Resolves once the health check has finished. A signal dropped without being
    /// resolved counts as unavailable.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        let ready = match rx.wait_for(|state| *state != ServiceState::Pending).await {
            Ok(state) => *state == ServiceState::Ready,
            Err(_) => false,
        };
        ready
    }
}

pub fn readiness() -> (ReadinessSignal, PlacesReadiness) {
    let (tx, rx) = watch::channel(ServiceState::Pending);
    (ReadinessSignal { tx }, PlacesReadiness { rx })
}

/// Lookup client plus its readiness, as the routes see it.
#[derive(Clone)]
pub struct PlacesService {
    lookup: Option<Arc<dyn PlaceLookup>>,
    readiness: PlacesReadiness,
}

impl PlacesService {
    /// Builds the service and spawns the one-time health check.
    pub fn start(lookup: Option<Arc<dyn PlaceLookup>>) -> Self {
        let (signal, readiness) = readiness();
        match lookup.clone() {
            None => signal.unavailable("no place lookup service configured"),
            Some(client) => {
                tokio::spawn(async move {
                    match client.health_check().await {
                        Ok(()) => {
                            info!("place lookup service ready");
                            signal.ready();
                        }
                        Err(err) => {
                            warn!("place lookup unavailable, autocomplete disabled: {err}");
                            signal.unavailable(err.to_string());
                        }
                    }
                });
            }
        }
        Self { lookup, readiness }
    }

    pub fn readiness(&self) -> &PlacesReadiness {
        &self.readiness
    }

    pub async fn autocomplete(&self, input: &str) -> Result<Vec<PlaceResult>, PlacesError> {
        if !self.readiness.wait().await {
            return Err(PlacesError::Unavailable);
        }
        let lookup = self.lookup.as_ref().ok_or(PlacesError::Unavailable)?;
        lookup.autocomplete(input).await
    }
}
