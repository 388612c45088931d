//! Client for the Openverse open-license media API.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_OPENVERSE_API_URL: &str = "https://api.openverse.engineering/v1/";

/// Licenses the upstream API can filter by.
pub const SUPPORTED_LICENSES: [&str; 8] = [
    "cc0", "pdm", "by", "by-sa", "by-nc", "by-nd", "by-nc-sa", "by-nc-nd",
];

/// Terms used to fill the "popular" listing.
const POPULAR_SEARCHES: [&str; 5] = ["nature", "technology", "art", "music", "people"];

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_POPULAR_LIMIT: u32 = 20;
pub const MAX_POPULAR_LIMIT: u32 = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad input; nothing was sent upstream
    #[error("{0}")]
    Validation(String),

    /// The upstream API failed or could not be reached
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Images,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "images" => Ok(Self::Images),
            "audio" => Ok(Self::Audio),
            _ => Err(SearchError::Validation(
                "Invalid media type. Use one of [images, audio]".to_string(),
            )),
        }
    }
}

fn default_media_type() -> String {
    MediaType::Images.as_str().to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// A media search as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    /// Comma-separated
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            media_type: default_media_type(),
            page: default_page(),
            page_size: default_page_size(),
            license_type: None,
            creator: None,
            tags: None,
            source: None,
        }
    }

    pub fn validate(&self) -> Result<MediaType, SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::Validation("query is required".to_string()));
        }

        let media_type = self.media_type.parse()?;

        if let Some(license) = &self.license_type
            && !SUPPORTED_LICENSES.contains(&license.as_str())
        {
            return Err(SearchError::Validation(format!(
                "Invalid license type. Use one of [{}]",
                SUPPORTED_LICENSES.join(", ")
            )));
        }

        if self.page < 1 {
            return Err(SearchError::Validation("page must be at least 1".to_string()));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(SearchError::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(media_type)
    }

    /// Parameters recorded alongside a saved search.
    pub fn search_params(&self) -> Value {
        json!({
            "media_type": self.media_type,
            "page": self.page,
            "page_size": self.page_size,
            "license_type": self.license_type,
            "creator": self.creator,
            "tags": self.tags,
            "source": self.source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the media API, including the version segment
    pub api_url: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OPENVERSE_API_URL.to_string(),
            api_key: None,
        }
    }
}

pub struct SearchClient {
    base_url: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid media API URL: {}", config.api_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Media API URL cannot be a base: {}", config.api_url);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: config.api_key.filter(|key| !key.is_empty()),
            client,
        })
    }

    /// Search the upstream API and return its response with a
    /// `search_info` block describing the query.
    pub async fn search_media(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let media_type = request.validate()?;
        let url = self.endpoint(&[media_type.as_str()])?;

        let mut params: Vec<(&str, String)> = vec![
            ("q", request.query.clone()),
            ("page", request.page.to_string()),
            ("page_size", request.page_size.to_string()),
        ];
        for (name, value) in [
            ("license", &request.license_type),
            ("creator", &request.creator),
            ("tags", &request.tags),
            ("source", &request.source),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, value.to_string()));
            }
        }

        debug!("Searching {} for {:?}", media_type, request.query);
        let mut result = self.get_json(url, &params).await?;

        if let Some(body) = result.as_object_mut() {
            body.insert(
                "search_info".to_string(),
                json!({
                    "query": request.query,
                    "media_type": media_type,
                    "page": request.page,
                    "page_size": request.page_size,
                    "license_type": request.license_type,
                    "creator": request.creator,
                    "tags": request.tags,
                    "source": request.source,
                }),
            );
        }

        Ok(result)
    }

    pub async fn get_media_details(
        &self,
        media_type: &str,
        media_id: &str,
    ) -> Result<Value, SearchError> {
        let media_type: MediaType = media_type.parse()?;
        if media_id.trim().is_empty() {
            return Err(SearchError::Validation("media id is required".to_string()));
        }

        let url = self.endpoint(&[media_type.as_str(), media_id])?;
        self.get_json(url, &[]).await
    }

    /// A page of items for one of a few broad seed terms, at most `limit` long.
    pub async fn get_popular_media(
        &self,
        media_type: &str,
        limit: u32,
    ) -> Result<Vec<Value>, SearchError> {
        if !(1..=MAX_POPULAR_LIMIT).contains(&limit) {
            return Err(SearchError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_POPULAR_LIMIT
            )));
        }

        let request = SearchRequest {
            media_type: media_type.to_string(),
            page_size: limit,
            ..SearchRequest::new(pick_popular_term())
        };

        let mut result = self.search_media(&request).await?;
        let mut items = match result.get_mut("results").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        items.truncate(limit as usize);

        Ok(items)
    }

    /// `{base}/{segments..}/`, with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SearchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::Upstream("Media API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn get_json(&self, url: Url, params: &[(&str, String)]) -> Result<Value, SearchError> {
        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            SearchError::Upstream(format!("Failed to connect to Openverse API: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").cloned())
                .map(|detail| match detail {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_default();

            return Err(SearchError::Upstream(format!(
                "Openverse API error: {} - {}",
                status.as_u16(),
                detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Upstream(format!("Invalid Openverse API response: {}", e)))
    }
}

fn pick_popular_term() -> &'static str {
    let index = chrono::Utc::now().timestamp_subsec_nanos() as usize % POPULAR_SEARCHES.len();
    POPULAR_SEARCHES[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> SearchClient {
        SearchClient::new(SearchConfig {
            api_url: format!("{}/v1/", server.uri()),
            api_key: api_key.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_media_type_parsing() {
        assert_eq!("images".parse::<MediaType>().unwrap(), MediaType::Images);
        assert_eq!("audio".parse::<MediaType>().unwrap(), MediaType::Audio);
        assert!(matches!(
            "video".parse::<MediaType>(),
            Err(SearchError::Validation(_))
        ));
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(SearchRequest::new("cats").validate().unwrap(), MediaType::Images);

        let mut request = SearchRequest::new("cats");
        request.license_type = Some("gpl".to_string());
        assert!(request.validate().is_err());

        let mut request = SearchRequest::new("cats");
        request.license_type = Some("by-nc-sa".to_string());
        assert!(request.validate().is_ok());

        let mut request = SearchRequest::new("cats");
        request.page = 0;
        assert!(request.validate().is_err());

        let mut request = SearchRequest::new("cats");
        request.page_size = 101;
        assert!(request.validate().is_err());

        assert!(SearchRequest::new("  ").validate().is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SearchClient::new(SearchConfig {
            api_url: "not a url".to_string(),
            api_key: None,
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_forwards_params_and_adds_search_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/audio/"))
            .and(query_param("q", "rain"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "5"))
            .and(query_param("license", "cc0"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result_count": 1,
                "results": [{ "id": "a1" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let request = SearchRequest {
            media_type: "audio".to_string(),
            page: 2,
            page_size: 5,
            license_type: Some("cc0".to_string()),
            ..SearchRequest::new("rain")
        };

        let result = client.search_media(&request).await.unwrap();
        assert_eq!(result["results"][0]["id"], "a1");
        assert_eq!(result["search_info"]["query"], "rain");
        assert_eq!(result["search_info"]["media_type"], "audio");
        assert_eq!(result["search_info"]["license_type"], "cc0");
        assert!(result["search_info"]["creator"].is_null());
    }

    #[tokio::test]
    async fn test_unsupported_media_type_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = SearchRequest {
            media_type: "video".to_string(),
            ..SearchRequest::new("cats")
        };

        let err = client.search_media(&request).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/images/"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({ "detail": "Request was throttled." })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .search_media(&SearchRequest::new("cats"))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Upstream(_)));
        assert_eq!(
            err.to_string(),
            "Openverse API error: 429 - Request was throttled."
        );
    }

    #[tokio::test]
    async fn test_media_details_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/images/abc-123/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc-123" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let details = client.get_media_details("images", "abc-123").await.unwrap();
        assert_eq!(details["id"], "abc-123");
    }

    #[tokio::test]
    async fn test_popular_media_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/images/"))
            .and(query_param("page_size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": "1" }, { "id": "2" }, { "id": "3" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let items = client.get_popular_media("images", 2).await.unwrap();
        assert_eq!(items.len(), 2);

        let err = client.get_popular_media("images", 51).await.unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
    }

    #[test]
    fn test_popular_term_is_a_seed() {
        assert!(POPULAR_SEARCHES.contains(&pick_popular_term()));
    }
}
