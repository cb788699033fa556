// Home Assistant REST client
//
// Wraps `reqwest::Client` with Home Assistant URL construction and status
// mapping. Bearer authentication is baked into the client's default
// headers by `TransportConfig::build_client`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::StateObject;

/// Raw HTTP client for the Home Assistant REST API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a new REST client. `base_url` is the Home Assistant root,
    /// e.g. `http://homeassistant.local:8123/`.
    pub fn new(
        base_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a REST client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The Home Assistant base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/` -- returns the `message` field ("API running.").
    pub async fn check_api(&self) -> Result<String, Error> {
        #[derive(serde::Deserialize)]
        struct ApiStatus {
            message: String,
        }
        let url = self.api_url("")?;
        let status: ApiStatus = self.get(url).await?;
        Ok(status.message)
    }

    /// `GET /api/states` -- every entity state known to Home Assistant.
    pub async fn get_states(&self) -> Result<Vec<StateObject>, Error> {
        let url = self.api_url("states")?;
        self.get(url).await
    }

    /// `POST /api/services/{domain}/{service}` with `data` as the body.
    ///
    /// Returns the states Home Assistant reports as changed by the call.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: &impl Serialize,
    ) -> Result<Vec<StateObject>, Error> {
        let url = self.api_url(&format!("services/{domain}/{service}"))?;
        self.post(url, data).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Map status codes onto `Error` and decode the body.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "access token rejected".into(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| body.clone());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}
