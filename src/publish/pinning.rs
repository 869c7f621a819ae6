use std::fmt;

use reqwest::multipart::{Form, Part};

use crate::foundation::core::Artifact;
use crate::foundation::error::{ReelError, ReelResult};
use crate::publish::{PublishedReference, Publisher, gateway_url};

/// Default upload endpoint.
pub const DEFAULT_PIN_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
/// Default public gateway base.
pub const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs";

const API_KEY_HEADER: &str = "pinata_api_key";
const API_SECRET_HEADER: &str = "pinata_secret_api_key";

/// A credential string that never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the credential for sending it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pinning service settings, fixed at startup.
#[derive(Clone, Debug)]
pub struct PinningConfig {
    /// Multipart upload endpoint.
    pub endpoint: String,
    /// Public gateway base URL.
    pub gateway: String,
    /// API key header value.
    pub api_key: Secret,
    /// API secret header value.
    pub api_secret: Secret,
}

impl PinningConfig {
    /// Settings for the default endpoint and gateway.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_PIN_ENDPOINT.to_string(),
            gateway: DEFAULT_GATEWAY.to_string(),
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
        }
    }
}

#[derive(serde::Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash", alias = "cid")]
    content_id: String,
}

/// [`Publisher`] that streams artifacts as a multipart `file` field.
///
/// Uploads have no body-size limit and no request timeout.
#[derive(Clone, Debug)]
pub struct PinningPublisher {
    client: reqwest::Client,
    cfg: PinningConfig,
}

impl PinningPublisher {
    /// Build a publisher with its own HTTP client.
    pub fn new(cfg: PinningConfig) -> ReelResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ReelError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, cfg))
    }

    /// Build a publisher on an existing client.
    pub fn with_client(client: reqwest::Client, cfg: PinningConfig) -> Self {
        Self { client, cfg }
    }

    async fn file_part(artifact: &Artifact) -> ReelResult<Part> {
        let kind = artifact.kind;
        let file = tokio::fs::File::open(artifact.path()).await.map_err(|e| {
            ReelError::publish_failed(
                kind,
                None,
                format!("open '{}': {e}", artifact.path().display()),
            )
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| ReelError::publish_failed(kind, None, format!("stat: {e}")))?
            .len();

        Part::stream_with_length(reqwest::Body::from(file), len)
            .file_name(artifact.file_name())
            .mime_str(kind.mime())
            .map_err(|e| ReelError::publish_failed(kind, None, e.to_string()))
    }
}

#[async_trait::async_trait]
impl Publisher for PinningPublisher {
    #[tracing::instrument(skip_all, fields(kind = %artifact.kind))]
    async fn publish(&self, artifact: &Artifact) -> ReelResult<PublishedReference> {
        let kind = artifact.kind;
        let form = Form::new().part("file", Self::file_part(artifact).await?);

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .header(API_KEY_HEADER, self.cfg.api_key.expose())
            .header(API_SECRET_HEADER, self.cfg.api_secret.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReelError::publish_failed(kind, None, e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ReelError::publish_failed(kind, Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(ReelError::publish_failed(kind, Some(status.as_u16()), body));
        }

        let parsed: PinResponse = serde_json::from_str(&body).map_err(|e| {
            ReelError::publish_failed(
                kind,
                Some(status.as_u16()),
                format!("unexpected pin response ({e}): {body}"),
            )
        })?;
        let url = gateway_url(&self.cfg.gateway, &parsed.content_id);
        tracing::info!(%url, "published");

        Ok(PublishedReference {
            kind,
            content_id: parsed.content_id,
            url,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/publish/pinning.rs"]
mod tests;
