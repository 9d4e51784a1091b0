//! Hub negotiation and socket URL construction

use crate::{TransportError, TransportResult};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// Negotiate protocol version this client speaks
pub const NEGOTIATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTransport {
    pub transport: String,
    #[serde(default)]
    pub transfer_formats: Vec<String>,
}

/// Body of `POST {hub}/negotiate`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub connection_token: Option<String>,
    #[serde(default)]
    pub negotiate_version: Option<u32>,
    #[serde(default)]
    pub available_transports: Vec<AvailableTransport>,
    /// Redirect to another service; not supported
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: String,
    /// Token to pass as `id` on the socket URL
    pub connection_token: String,
}

impl NegotiateResponse {
    /// Validate the response and extract the session identifiers
    pub fn into_session(self) -> TransportResult<Session> {
        if let Some(error) = self.error {
            return Err(TransportError::Negotiate(error));
        }
        if self.url.is_some() {
            return Err(TransportError::Negotiate("redirects are not supported".into()));
        }
        if !self.available_transports.is_empty()
            && !self
                .available_transports
                .iter()
                .any(|t| t.transport == "WebSockets")
        {
            return Err(TransportError::Negotiate(
                "server does not offer WebSockets".into(),
            ));
        }

        let connection_id = self
            .connection_id
            .ok_or_else(|| TransportError::Negotiate("missing connectionId".into()))?;
        // Version 0 servers only hand out the id
        let connection_token = self.connection_token.unwrap_or_else(|| connection_id.clone());

        Ok(Session {
            connection_id,
            connection_token,
        })
    }
}

/// `{hub}/negotiate?negotiateVersion=1`
pub fn negotiate_url(hub_url: &str) -> TransportResult<Url> {
    let mut url = parse(hub_url)?;
    let path = format!("{}/negotiate", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .append_pair("negotiateVersion", &NEGOTIATE_VERSION.to_string());
    Ok(url)
}

/// Socket URL for a hub: http becomes ws, https becomes wss,
/// and the connection token (if any) is passed as `id`
pub fn socket_url(hub_url: &str, connection_token: Option<&str>) -> TransportResult<Url> {
    let mut url = parse(hub_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(hub_url.to_string()))?;

    if let Some(token) = connection_token {
        url.query_pairs_mut().append_pair("id", token);
    }
    Ok(url)
}

/// Ask the hub for a connection id and token
pub async fn negotiate(client: &Client, hub_url: &str) -> TransportResult<Session> {
    let url = negotiate_url(hub_url)?;
    debug!(url = %url, "Negotiating");

    let response = client
        .post(url)
        .send()
        .await
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Negotiate(format!("server returned {}", status)));
    }

    let body: NegotiateResponse = response
        .json()
        .await
        .map_err(|e| TransportError::Negotiate(e.to_string()))?;
    body.into_session()
}

fn parse(hub_url: &str) -> TransportResult<Url> {
    Url::parse(hub_url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", hub_url, e)))
}
