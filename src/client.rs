//! REST client shared by every service module
//!
//! Endpoint methods live next to their types (`auth`, `rooms`, `movies`,
//! `matches`); this module holds the plumbing they share.

use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchBuilder};
use crate::store::{CredentialStore, TOKEN_KEY};

/// Authenticated JSON client for the watchd API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    credentials: Arc<dyn CredentialStore>,
    unauthorized: broadcast::Sender<String>,
    options: ClientOptions,
}

impl ApiClient {
    /// Create a new client reading its bearer token from `credentials`
    pub fn new(options: ClientOptions, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        url::Url::parse(&options.api_base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        let (unauthorized, _) = broadcast::channel(16);

        Ok(Self {
            base_url: options.api_base_url.trim_end_matches('/').to_string(),
            http_client,
            credentials,
            unauthorized,
            options,
        })
    }

    /// Client options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The credential store backing the bearer token
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// For every request that came back 401, the bearer token it was sent with.
    pub fn on_unauthorized(&self) -> broadcast::Receiver<String> {
        self.unauthorized.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::get(&self.http_client, &self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::post(&self.http_client, &self.url(path))
    }

    pub(crate) fn patch(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::patch(&self.http_client, &self.url(path))
    }

    pub(crate) fn delete(&self, path: &str) -> FetchBuilder<'_> {
        Fetch::delete(&self.http_client, &self.url(path))
    }

    /// Execute a request that needs the session's bearer token.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: FetchBuilder<'_>) -> Result<T> {
        let token = self.credentials.load(TOKEN_KEY).filter(|t| !t.is_empty());
        let request = match &token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match request.execute::<T>().await {
            Err(Error::Unauthorized) => {
                if let Some(token) = token {
                    debug!("Publishing unauthorized signal");
                    let _ = self.unauthorized.send(token);
                }
                Err(Error::Unauthorized)
            }
            other => other,
        }
    }

    /// Execute a request that is made without a session.
    pub(crate) async fn send_anonymous<T: DeserializeOwned>(
        &self,
        request: FetchBuilder<'_>,
    ) -> Result<T> {
        request.anonymous().execute::<T>().await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
