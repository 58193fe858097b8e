//! DigitalOcean implementation of the instance source.
//!
//! Lists droplets through the public REST API with bearer-token
//! authentication, following the API's page links until the listing is
//! exhausted. Only the fields the sync pipeline needs are deserialized;
//! the public IPv4 address is picked from the droplet's v4 network list.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::{InstanceSource, RawInstance, SourceFuture};

const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com";
const PER_PAGE: u32 = 200;

/// Errors raised by the DigitalOcean source.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DigitalOceanError {
    /// Raised when the HTTP request cannot be completed.
    #[error("transport error talking to DigitalOcean: {message}")]
    Transport {
        /// Message returned by the HTTP client.
        message: String,
    },
    /// Raised when the API rejects the configured token.
    #[error("DigitalOcean rejected the API token")]
    Unauthorized,
    /// Raised when the API answers with an unexpected status code.
    #[error("unexpected status {status} from DigitalOcean")]
    UnexpectedStatus {
        /// HTTP status code returned by the API.
        status: u16,
    },
    /// Raised when a response body cannot be decoded.
    #[error("failed to decode DigitalOcean response: {message}")]
    Decode {
        /// Message returned by the decoder.
        message: String,
    },
}

/// Instance source backed by the DigitalOcean droplets API.
#[derive(Clone, Debug)]
pub struct DigitalOceanSource {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl DigitalOceanSource {
    /// Creates a source for the public DigitalOcean API.
    ///
    /// # Errors
    ///
    /// Returns [`DigitalOceanError::Transport`] when the HTTP client cannot
    /// be constructed.
    pub fn new(token: impl Into<String>) -> Result<Self, DigitalOceanError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a source against an alternate API endpoint, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`DigitalOceanError::Transport`] when the HTTP client cannot
    /// be constructed.
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, DigitalOceanError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| DigitalOceanError::Transport {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    async fn fetch_all(&self) -> Result<Vec<RawInstance>, DigitalOceanError> {
        let mut instances = Vec::new();
        let mut page = 1_u32;

        loop {
            let listing = self.fetch_page(page).await?;
            let has_next = listing.has_next_page();
            instances.extend(listing.droplets.into_iter().map(payload_to_raw));
            if !has_next {
                return Ok(instances);
            }
            page += 1;
        }
    }

    async fn fetch_page(&self, page: u32) -> Result<DropletPage, DigitalOceanError> {
        let url = format!(
            "{}/v2/droplets?page={page}&per_page={PER_PAGE}",
            self.base_url
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| DigitalOceanError::Transport {
                message: err.to_string(),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DigitalOceanError::Unauthorized)
            }
            status if !status.is_success() => Err(DigitalOceanError::UnexpectedStatus {
                status: status.as_u16(),
            }),
            _ => response
                .json::<DropletPage>()
                .await
                .map_err(|err| DigitalOceanError::Decode {
                    message: err.to_string(),
                }),
        }
    }
}

impl InstanceSource for DigitalOceanSource {
    type Error = DigitalOceanError;

    fn list_all(&self) -> SourceFuture<'_, Vec<RawInstance>, Self::Error> {
        Box::pin(self.fetch_all())
    }
}

#[derive(Debug, Default, Deserialize)]
struct DropletPage {
    #[serde(default)]
    droplets: Vec<DropletPayload>,
    #[serde(default)]
    links: PageLinks,
}

impl DropletPage {
    fn has_next_page(&self) -> bool {
        self.links
            .pages
            .as_ref()
            .is_some_and(|pages| pages.next.is_some())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    pages: Option<PageCursors>,
}

#[derive(Debug, Default, Deserialize)]
struct PageCursors {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DropletPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    networks: DropletNetworks,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DropletNetworks {
    #[serde(default)]
    v4: Vec<NetworkV4>,
}

#[derive(Debug, Default, Deserialize)]
struct NetworkV4 {
    #[serde(default)]
    ip_address: String,
    #[serde(default, rename = "type")]
    kind: String,
}

fn payload_to_raw(payload: DropletPayload) -> RawInstance {
    let public_ip = payload
        .networks
        .v4
        .iter()
        .find(|network| network.kind == "public")
        .map(|network| network.ip_address.clone());
    RawInstance {
        name: payload.name,
        public_ip,
        tags: payload.tags,
    }
}
