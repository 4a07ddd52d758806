use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use super::{build_query, parse_response, TagQuery};
use crate::models::{MapFeature, Place};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Pause before the first retry; later retries wait proportionally longer
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fetches OSM features inside a bounding box from an Overpass endpoint
pub struct OverpassClient {
    client: Client,
    endpoint: Url,
    timeout_secs: u64,
    /// Total tries per query, the first one included
    max_attempts: u32,
    retry_delay: Duration,
}

impl OverpassClient {
    pub fn new(endpoint: Url, user_agent: &str, timeout_secs: u64, max_attempts: u32) -> Result<Self> {
        // Give the HTTP client a little longer than the server-side query timeout
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs + 30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            timeout_secs,
            max_attempts: max_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch every element matching `tags` inside the place's box
    pub async fn fetch_features(&self, place: &Place, tags: &TagQuery) -> Result<Vec<MapFeature>> {
        let query = build_query(place, tags, self.timeout_secs);
        debug!("Overpass query:\n{}", query);

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("data", &query)
            .finish();

        let mut attempts = 0;
        let text = loop {
            attempts += 1;

            let response = self
                .client
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone())
                .send()
                .await
                .with_context(|| format!("Overpass request to {} failed", self.endpoint))?;

            let status = response.status();
            if status.is_success() {
                break response
                    .text()
                    .await
                    .context("Failed to read Overpass response")?;
            }

            // Overpass answers 429/504 when the server is busy
            let busy = status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::GATEWAY_TIMEOUT;
            if busy && attempts < self.max_attempts {
                warn!(
                    "Overpass busy with status {} (attempt {}/{}), retrying",
                    status, attempts, self.max_attempts
                );
                tokio::time::sleep(self.retry_delay * attempts).await;
                continue;
            }

            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Overpass query for '{}' failed with status {}: {}",
                place.name,
                status,
                error_text.trim()
            );
        };

        let features = parse_response(&text, tags)?;
        info!("Fetched {} OSM features for {}", features.len(), place.name);
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overpass::TagFilter;
    use crate::test_support::{serve, Reply};

    const CAMPSITE: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 55.0, "lon": -125.0, "tags": {"tourism": "camp_site"}}
    ]}"#;

    fn place() -> Place {
        Place::new("Nation Lakes", 55.2, 54.9, -124.9, -125.6)
    }

    fn tags() -> TagQuery {
        let mut tags = TagQuery::new();
        tags.insert("tourism", TagFilter::Any).unwrap();
        tags
    }

    fn client(endpoint: Url, max_attempts: u32) -> OverpassClient {
        OverpassClient::new(endpoint, "canoemap-test", 25, max_attempts)
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_fetch_features() {
        let (url, requests) = serve(vec![Reply::text(200, CAMPSITE)]).await;
        let features = client(url, 2).fetch_features(&place(), &tags()).await.unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].source_id(), "node/1");
        assert_eq!(requests.count(), 1);
    }

    #[tokio::test]
    async fn test_busy_server_is_retried() {
        let (url, requests) = serve(vec![
            Reply::text(429, "rate limited"),
            Reply::text(504, "timeout"),
            Reply::text(200, CAMPSITE),
        ])
        .await;
        let features = client(url, 3).fetch_features(&place(), &tags()).await.unwrap();

        assert_eq!(features.len(), 1);
        assert_eq!(requests.count(), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let (url, requests) = serve(vec![
            Reply::text(429, "rate limited"),
            Reply::text(200, CAMPSITE),
        ])
        .await;
        let err = client(url, 1)
            .fetch_features(&place(), &tags())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"), "{}", err);
        assert_eq!(requests.count(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_fail_with_body() {
        let (url, requests) = serve(vec![
            Reply::text(400, "Error: line 3: parse error: ']' expected"),
            Reply::text(200, CAMPSITE),
        ])
        .await;
        let err = client(url, 3)
            .fetch_features(&place(), &tags())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"), "{}", message);
        assert!(message.contains("parse error: ']' expected"), "{}", message);
        assert!(message.contains("Nation Lakes"), "{}", message);
        assert_eq!(requests.count(), 1);
    }

    #[tokio::test]
    async fn test_query_is_sent_as_form_data() {
        let (url, requests) = serve(vec![Reply::text(200, CAMPSITE)]).await;
        client(url, 1).fetch_features(&place(), &tags()).await.unwrap();

        let bodies = requests.bodies();
        assert_eq!(bodies.len(), 1);
        let query: Vec<(String, String)> = url::form_urlencoded::parse(bodies[0].as_bytes())
            .into_owned()
            .collect();
        assert_eq!(query[0].0, "data");
        assert!(query[0].1.starts_with("[out:json][timeout:25];"));
        assert!(query[0].1.contains("nwr[\"tourism\"](54.9,-125.6,55.2,-124.9);"));
    }
}
