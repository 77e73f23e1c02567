// Backend HTTP client
//
// Wraps `reqwest::Client` with base-path-aware URL construction and the
// GraphQL `{ data, errors }` envelope. Every method returns unwrapped
// payloads -- callers never see the envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ImageRecord, StaticInfo, SummaryRecord};
use crate::transport::TransportConfig;

const ALL_SUMMARIES_QUERY: &str = "query getAllImageSummaries($from: Time, $to: Time) {
  getAllImageSummaries(from: $from, to: $to)
}";

const IMAGE_QUERY: &str = "query getImage($bucket: String!, $name: String!) {
  getImage(bucket: $bucket, name: $name) {
    imageSummary {
      bucket key name group type dynamicFilters
      features { class count objects cachedObject { lastModified cacheKey } }
      cachedObject { lastModified cacheKey }
    }
    geonames { topLevel objects cachedObject { lastModified cacheKey } }
    localization { corner cachedObject { lastModified cacheKey } }
    features { class count objects cachedObject { lastModified cacheKey } }
    additionalFiles
    targetFiles
    fullProductFiles
  }
}";

/// Optional bounds for the summary listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

type GroupedSummaries = BTreeMap<String, BTreeMap<String, Vec<SummaryRecord>>>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllSummariesData {
    #[serde(default)]
    get_all_image_summaries: Option<GroupedSummaries>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageData {
    #[serde(default)]
    get_image: Option<ImageRecord>,
}

/// HTTP client for the catalog backend.
///
/// `base_url` is the deployment root including any base path
/// (e.g. `https://images.example.com/viewer/`).
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    /// The deployment root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Browsable URL for a backend cache key.
    pub fn cache_url(&self, cache_key: &str) -> Result<Url, Error> {
        Ok(self
            .base_url
            .join("api/cache/")?
            .join(cache_key.trim_start_matches('/'))?)
    }

    /// Notification endpoint (`ws://` or `wss://` mirror of the base URL).
    pub fn ws_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join("api/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::WebSocketConnect(format!("cannot derive {scheme} URL from {url}")))?;
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Every summary the backend knows, flattened out of its
    /// `group → type → [summary]` grouping.
    pub async fn all_image_summaries(
        &self,
        range: Option<TimeRange>,
    ) -> Result<Vec<SummaryRecord>, Error> {
        let variables = serde_json::to_value(range.unwrap_or_default()).map_err(|e| {
            Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            }
        })?;
        let data: AllSummariesData = self.graphql(ALL_SUMMARIES_QUERY, variables).await?;

        let flattened: Vec<SummaryRecord> = data
            .get_all_image_summaries
            .unwrap_or_default()
            .into_values()
            .flat_map(BTreeMap::into_values)
            .flatten()
            .collect();
        debug!(count = flattened.len(), "fetched image summaries");
        Ok(flattened)
    }

    /// Full detail record for one image.
    pub async fn image(&self, bucket: &str, name: &str) -> Result<ImageRecord, Error> {
        let variables = serde_json::json!({ "bucket": bucket, "name": name });
        let data: ImageData = self.graphql(IMAGE_QUERY, variables).await?;
        data.get_image.ok_or_else(|| Error::NotFound {
            bucket: bucket.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Deployment metadata (titles, image groups, limits).
    pub async fn static_info(&self) -> Result<StaticInfo, Error> {
        let url = self.base_url.join("api/info")?;
        debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        let body = check_status(resp).await?;
        decode(&body)
    }

    // ── Transport mechanics ──────────────────────────────────────────

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, Error> {
        let url = self.base_url.join("api/graphql")?;
        debug!(%url, "POST graphql");

        let resp = self
            .http
            .post(url)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;
        let body = check_status(resp).await?;
        trace!(len = body.len(), "graphql response body");

        let envelope: GraphQlResponse<T> = decode(&body)?;
        if !envelope.errors.is_empty() {
            return Err(Error::GraphQl {
                messages: envelope.errors.into_iter().map(|e| e.message).collect(),
            });
        }
        envelope.data.ok_or_else(|| Error::Deserialization {
            message: "response carries neither data nor errors".into(),
            body,
        })
    }
}

async fn check_status(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(Error::Http {
            status: status.as_u16(),
            message: body,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn base_path_gets_trailing_slash() {
        let c = client("https://host/viewer");
        assert_eq!(c.base_url().as_str(), "https://host/viewer/");
    }

    #[test]
    fn cache_url_keeps_base_path() {
        let c = client("https://host/viewer/");
        let url = c.cache_url("/bucket/dir/preview.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://host/viewer/api/cache/bucket/dir/preview.jpg"
        );
    }

    #[test]
    fn ws_url_mirrors_scheme() {
        assert_eq!(
            client("https://host/viewer").ws_url().unwrap().as_str(),
            "wss://host/viewer/api/ws"
        );
        assert_eq!(
            client("http://localhost:8080").ws_url().unwrap().as_str(),
            "ws://localhost:8080/api/ws"
        );
    }
}
