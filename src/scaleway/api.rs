//! Typed client for the legacy per-region Scaleway control-plane API.
//!
//! Every call authenticates with the `X-Auth-Token` header and exchanges
//! JSON bodies. The driver consumes the client through the [`InstanceApi`]
//! trait so tests can substitute a recording fake; transport, TLS, and JSON
//! handling stay inside `reqwest` and `serde`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DriverConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Future returned by API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Builds the control-plane base URL for a region (e.g. `ams1`, `par1`).
#[must_use]
pub fn region_base_url(region: &str) -> String {
    format!("https://cp-{region}.scaleway.com")
}

/// Power actions accepted by the server action endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerAction {
    /// Boot the server.
    PowerOn,
    /// Gracefully power the server off.
    PowerOff,
    /// Reboot the server.
    Reboot,
    /// Stop the server and delete it together with its volumes.
    Terminate,
}

impl ServerAction {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PowerOn => "poweron",
            Self::PowerOff => "poweroff",
            Self::Reboot => "reboot",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for ServerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server record as reported by the provider.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Server {
    /// Opaque server identifier.
    pub id: String,
    /// Server name.
    pub name: String,
    /// Provider-reported status string (e.g. `running`).
    pub state: String,
    /// Public address attached to the server, when one is assigned.
    #[serde(default)]
    pub public_ip: Option<ServerIp>,
}

/// Public address block embedded in a server record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ServerIp {
    /// Identifier of the address resource.
    pub id: String,
    /// Dotted-quad address.
    pub address: String,
}

/// Reserved IP resource, detached from any server lifecycle.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReservedIp {
    /// Identifier of the address resource.
    pub id: String,
    /// Dotted-quad address.
    pub address: String,
}

/// Bootable image summary used for label resolution.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Image {
    /// Image identifier.
    pub id: String,
    /// Human-readable image name.
    pub name: String,
    /// Lifecycle state; empty when the endpoint omits it.
    #[serde(default)]
    pub state: String,
    /// RFC 3339 creation timestamp; sorts lexically.
    #[serde(default)]
    pub creation_date: String,
}

/// Additional volume entry in a server creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VolumeSpec {
    /// Volume size in bytes.
    pub size: u64,
    /// Provider volume class.
    pub volume_type: String,
}

/// Body of the server creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateServer {
    /// Server name.
    pub name: String,
    /// Organization the server is billed to.
    pub organization: String,
    /// Resolved image identifier.
    pub image: String,
    /// Commercial type (instance sizing).
    pub commercial_type: String,
    /// Boot-time tags; the first entries carry the SSH key token.
    pub tags: Vec<String>,
    /// Whether IPv6 is enabled on the server.
    pub enable_ipv6: bool,
    /// Reserved IP identifier to attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    /// Additional volumes keyed by slot index (`"1"`, `"2"`, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, VolumeSpec>>,
}

/// Errors raised by the API client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Endpoint that was being called.
        url: String,
        /// Transport-level error message.
        message: String,
    },
    /// The provider answered with a non-success status.
    #[error("Scaleway API returned {status} for {url}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Endpoint that was being called.
        url: String,
        /// Message extracted from the error body.
        message: String,
    },
    /// A success response could not be decoded.
    #[error("failed to decode {what} response: {message}")]
    Decode {
        /// Name of the payload being decoded.
        what: &'static str,
        /// Parser error message.
        message: String,
    },
}

/// Remote operations the provisioning driver depends on.
pub trait InstanceApi {
    /// Creates a server and returns its initial record.
    fn create_server<'a>(&'a self, request: &'a CreateServer) -> ApiFuture<'a, Server>;

    /// Fetches a server record; `None` when the provider reports it absent.
    fn get_server<'a>(&'a self, server_id: &'a str) -> ApiFuture<'a, Option<Server>>;

    /// Posts a power action for the server.
    fn server_action<'a>(&'a self, server_id: &'a str, action: ServerAction) -> ApiFuture<'a, ()>;

    /// Lists the bootable images visible to the organization.
    fn list_images(&self) -> ApiFuture<'_, Vec<Image>>;

    /// Allocates a new reserved IP.
    fn reserve_ip(&self) -> ApiFuture<'_, ReservedIp>;

    /// Fetches a reserved IP; `None` when the identifier does not resolve.
    fn get_ip<'a>(&'a self, ip_id: &'a str) -> ApiFuture<'a, Option<ReservedIp>>;

    /// Releases a reserved IP back to the provider.
    fn release_ip<'a>(&'a self, ip_id: &'a str) -> ApiFuture<'a, ()>;
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Deserialize)]
struct IpEnvelope {
    ip: ReservedIp,
}

#[derive(Deserialize)]
struct ImagesEnvelope {
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extracts the provider's error message from a response body, falling back
/// to the raw text when the body is not the usual `{"message": …}` shape.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map_or_else(|_| String::from_utf8_lossy(body).into_owned(), |parsed| parsed.message)
}

fn decode<T: DeserializeOwned>(what: &'static str, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Decode {
        what,
        message: err.to_string(),
    })
}

/// Client for one region's control plane.
#[derive(Clone, Debug)]
pub struct HttpApi {
    base_url: String,
    organization: String,
    token: String,
}

impl HttpApi {
    /// Builds a client for the region and credentials in `config`.
    #[must_use]
    pub fn new(config: &DriverConfig) -> Self {
        Self::with_base_url(region_base_url(&config.region), &config.organization, &config.token)
    }

    /// Builds a client against an explicit base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        organization: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            organization: organization.into(),
            token: token.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<(reqwest::StatusCode, Vec<u8>), ApiError> {
        let response = request
            .header(AUTH_TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                url: url.to_owned(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| ApiError::Transport {
            url: url.to_owned(),
            message: err.to_string(),
        })?;

        Ok((status, body.to_vec()))
    }

    async fn create_server_call(&self, request: &CreateServer) -> Result<Server, ApiError> {
        let url = self.endpoint("/servers");
        let (status, body) = self.send(HTTP_CLIENT.post(&url).json(request), &url).await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        decode::<ServerEnvelope>("server", &body).map(|envelope| envelope.server)
    }

    async fn get_server_call(&self, server_id: &str) -> Result<Option<Server>, ApiError> {
        let url = self.endpoint(&format!("/servers/{server_id}"));
        let (status, body) = self.send(HTTP_CLIENT.get(&url), &url).await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        decode::<ServerEnvelope>("server", &body).map(|envelope| Some(envelope.server))
    }

    async fn server_action_call(
        &self,
        server_id: &str,
        action: ServerAction,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/servers/{server_id}/action"));
        let payload = serde_json::json!({ "action": action.as_str() });
        let (status, body) = self.send(HTTP_CLIENT.post(&url).json(&payload), &url).await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        Ok(())
    }

    async fn list_images_call(&self) -> Result<Vec<Image>, ApiError> {
        let url = self.endpoint("/images");
        let (status, body) = self.send(HTTP_CLIENT.get(&url), &url).await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        decode::<ImagesEnvelope>("images", &body).map(|envelope| envelope.images)
    }

    async fn reserve_ip_call(&self) -> Result<ReservedIp, ApiError> {
        let url = self.endpoint("/ips");
        let payload = serde_json::json!({ "organization": self.organization });
        let (status, body) = self.send(HTTP_CLIENT.post(&url).json(&payload), &url).await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        decode::<IpEnvelope>("ip", &body).map(|envelope| envelope.ip)
    }

    async fn get_ip_call(&self, ip_id: &str) -> Result<Option<ReservedIp>, ApiError> {
        let url = self.endpoint(&format!("/ips/{ip_id}"));
        let (status, body) = self.send(HTTP_CLIENT.get(&url), &url).await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        decode::<IpEnvelope>("ip", &body).map(|envelope| Some(envelope.ip))
    }

    async fn release_ip_call(&self, ip_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/ips/{ip_id}"));
        let (status, body) = self.send(HTTP_CLIENT.delete(&url), &url).await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                url,
                message: error_message(&body),
            });
        }
        Ok(())
    }
}

impl InstanceApi for HttpApi {
    fn create_server<'a>(&'a self, request: &'a CreateServer) -> ApiFuture<'a, Server> {
        Box::pin(self.create_server_call(request))
    }

    fn get_server<'a>(&'a self, server_id: &'a str) -> ApiFuture<'a, Option<Server>> {
        Box::pin(self.get_server_call(server_id))
    }

    fn server_action<'a>(&'a self, server_id: &'a str, action: ServerAction) -> ApiFuture<'a, ()> {
        Box::pin(self.server_action_call(server_id, action))
    }

    fn list_images(&self) -> ApiFuture<'_, Vec<Image>> {
        Box::pin(self.list_images_call())
    }

    fn reserve_ip(&self) -> ApiFuture<'_, ReservedIp> {
        Box::pin(self.reserve_ip_call())
    }

    fn get_ip<'a>(&'a self, ip_id: &'a str) -> ApiFuture<'a, Option<ReservedIp>> {
        Box::pin(self.get_ip_call(ip_id))
    }

    fn release_ip<'a>(&'a self, ip_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(self.release_ip_call(ip_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_base_url_targets_the_regional_control_plane() {
        assert_eq!(region_base_url("ams1"), "https://cp-ams1.scaleway.com");
        assert_eq!(region_base_url("par1"), "https://cp-par1.scaleway.com");
    }

    #[test]
    fn error_message_prefers_the_json_message_field() {
        let body = br#"{"message": "quota exceeded", "type": "quota_error"}"#;
        assert_eq!(error_message(body), "quota exceeded");
    }

    #[test]
    fn error_message_falls_back_to_raw_text() {
        assert_eq!(error_message(b"gateway timeout"), "gateway timeout");
    }

    #[test]
    fn create_server_omits_absent_optional_fields() {
        let request = CreateServer {
            name: String::from("machine-1"),
            organization: String::from("org-1"),
            image: String::from("image-1"),
            commercial_type: String::from("VC1S"),
            tags: vec![String::from("AUTHORIZED_KEY=k")],
            enable_ipv6: false,
            public_ip: None,
            volumes: None,
        };
        let value = serde_json::to_value(&request).unwrap_or_else(|err| panic!("serialize: {err}"));
        let object = value
            .as_object()
            .unwrap_or_else(|| panic!("request should serialize to an object"));
        assert!(!object.contains_key("public_ip"));
        assert!(!object.contains_key("volumes"));
        assert_eq!(object.get("commercial_type"), Some(&serde_json::json!("VC1S")));
    }

    #[test]
    fn server_action_wire_names() {
        assert_eq!(ServerAction::PowerOn.as_str(), "poweron");
        assert_eq!(ServerAction::PowerOff.as_str(), "poweroff");
        assert_eq!(ServerAction::Reboot.as_str(), "reboot");
        assert_eq!(ServerAction::Terminate.as_str(), "terminate");
    }
}
