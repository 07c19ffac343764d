use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::HubError;

/// Thin HTTP wrapper around the datasets-server REST API.
pub struct HubClient {
    endpoint: String,
    origin: Url,
    token: Option<String>,
    client: Client,
}

impl HubClient {
    /// Fails when `endpoint` is not an absolute URL or the HTTP client cannot
    /// be initialised (TLS backend, for instance).
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        proxy: Option<&str>,
    ) -> Result<Self, HubError> {
        let endpoint = endpoint.trim_end_matches('/').to_owned();
        let origin = Url::parse(&endpoint).map_err(|e| HubError::InvalidUrl {
            message: format!("{endpoint}: {e}"),
        })?;

        let mut builder =
            Client::builder().user_agent(concat!("framekit-hub/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(p) => {
                    builder = builder.proxy(p);
                }
                Err(e) => {
                    warn!(proxy = proxy_url, error = %e, "ignoring invalid proxy URL");
                }
            }
        }

        let client = builder.build()?;

        Ok(Self {
            endpoint,
            origin,
            token,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build `{endpoint}/{path}?{params}`.
    pub fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, HubError> {
        let base = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        Url::parse_with_params(&base, params).map_err(|e| HubError::InvalidUrl {
            message: format!("{base}: {e}"),
        })
    }

    /// GET a JSON document from the API. `repo` is only used for error
    /// messages.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url, repo: &str) -> Result<T, HubError> {
        debug!(%url, "hub request");
        let mut request = self
            .client
            .get(url.clone())
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        check_status(resp.status(), url.as_str(), repo)?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Download a media asset referenced by a row. The token is only sent to
    /// the API origin itself, never to asset CDNs.
    pub async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, HubError> {
        let parsed = Url::parse(url).map_err(|e| HubError::InvalidUrl {
            message: format!("{url}: {e}"),
        })?;
        let send_token = self.sends_token_to(&parsed);
        let mut request = self.client.get(parsed);
        if let Some(token) = self.token.as_ref().filter(|_| send_token) {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HubError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Same scheme, host and port as the endpoint.
    fn sends_token_to(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }
}

fn check_status(status: StatusCode, url: &str, repo: &str) -> Result<(), HubError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(HubError::Unauthorized {
            repo: repo.to_owned(),
            status: status.as_u16(),
        });
    }
    Err(HubError::Status {
        url: url.to_owned(),
        status: status.as_u16(),
    })
}
