use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use evrd_domain::SiteReconciliationRequest;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::BusError;
use crate::token::{best_effort_token, TokenProvider};

/// The single topic this service produces to.
pub const EVENT_TOPIC: &str = "libops-control-plane";

/// Publishes reconciliation requests to the message bus. Implementations
/// must block until the broker confirms a message id or returns a final
/// error — the caller treats a publish failure for one site as non-fatal
/// and continues with the rest of the batch.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish_site_reconciliation(
        &self,
        req: &SiteReconciliationRequest,
    ) -> Result<String, BusError>;
}

/// Tracks which topics have already been confirmed to exist, so repeat
/// publishes skip the create-topic round trip. Holds no other mutable
/// state — never exposed as a bare map across a module boundary.
#[derive(Default)]
struct TopicCache {
    known: Mutex<HashSet<String>>,
}

impl TopicCache {
    async fn is_known(&self, topic: &str) -> bool {
        self.known.lock().await.contains(topic)
    }

    async fn mark_known(&self, topic: &str) {
        self.known.lock().await.insert(topic.to_string());
    }
}

/// Publisher backed by a Pub/Sub-style REST API, reached over `reqwest`.
pub struct PubSubPublisher {
    project_id: String,
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base_url: String,
    topics: TopicCache,
}

impl PubSubPublisher {
    pub fn new(project_id: impl Into<String>, token: Box<dyn TokenProvider>) -> Self {
        Self {
            project_id: project_id.into(),
            client: reqwest::Client::new(),
            token,
            base_url: "https://pubsub.googleapis.com".to_string(),
            topics: TopicCache::default(),
        }
    }

    #[cfg(test)]
    fn with_base_url(
        project_id: impl Into<String>,
        token: Box<dyn TokenProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            client: reqwest::Client::new(),
            token,
            base_url: base_url.into(),
            topics: TopicCache::default(),
        }
    }

    fn topic_path(&self, topic: &str) -> String {
        format!("projects/{}/topics/{}", self.project_id, topic)
    }

    async fn ensure_topic(&self, topic: &str, token: Option<&str>) -> Result<(), BusError> {
        if self.topics.is_known(topic).await {
            return Ok(());
        }

        let url = format!("{}/v1/{}", self.base_url, self.topic_path(topic));
        let mut req = self.client.put(&url).json(&json!({}));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| BusError::TopicCreationFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() && status.as_u16() != 409 {
            let body = resp.text().await.unwrap_or_default();
            return Err(BusError::TopicCreationFailed(format!(
                "{status}: {body}"
            )));
        }

        info!(topic, "topic ensured");
        self.topics.mark_known(topic).await;
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        req: &SiteReconciliationRequest,
    ) -> Result<String, BusError> {
        let token = best_effort_token(self.token.as_ref()).await;
        self.ensure_topic(topic, token.as_deref()).await?;

        let body = serde_json::to_vec(req)
            .map_err(|e| BusError::Internal(format!("encode request: {e}")))?;
        let data = base64_encode(&body);

        let payload = json!({
            "messages": [{
                "data": data,
                "attributes": {
                    "site_public_id": req.site_public_id,
                    "project_public_id": req.project_public_id,
                    "org_public_id": req.org_public_id,
                    "request_type": req.request_type.to_string(),
                },
            }],
        });

        let url = format!("{}/v1/{}:publish", self.base_url, self.topic_path(topic));
        debug!(url, "publishing site reconciliation request");
        let mut http_req = self.client.post(&url).json(&payload);
        if let Some(t) = &token {
            http_req = http_req.bearer_auth(t);
        }
        let resp = http_req
            .send()
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BusError::PublishFailed(format!("{status}: {text}")));
        }

        let parsed: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BusError::Internal(format!("decode publish response: {e}")))?;
        let message_id = parsed["messageIds"][0]
            .as_str()
            .ok_or_else(|| BusError::Internal("publish response missing messageIds".to_string()))?
            .to_string();
        Ok(message_id)
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[async_trait]
impl Publisher for PubSubPublisher {
    async fn publish_site_reconciliation(
        &self,
        req: &SiteReconciliationRequest,
    ) -> Result<String, BusError> {
        self.publish(EVENT_TOPIC, req).await
    }
}

/// Logs every request instead of sending it anywhere. Used in tests and
/// local dev when no broker credentials are configured.
pub struct LoggingPublisher {
    counter: Arc<Mutex<u64>>,
}

impl Default for LoggingPublisher {
    fn default() -> Self {
        Self {
            counter: Arc::new(Mutex::new(0)),
        }
    }
}

impl LoggingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish_site_reconciliation(
        &self,
        req: &SiteReconciliationRequest,
    ) -> Result<String, BusError> {
        let mut guard = self.counter.lock().await;
        *guard += 1;
        let message_id = format!("logging-{}", *guard);
        info!(
            site_public_id = %req.site_public_id,
            project_public_id = %req.project_public_id,
            org_public_id = %req.org_public_id,
            request_type = %req.request_type,
            message_id,
            "would publish site reconciliation request"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evrd_domain::ReconciliationType;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> SiteReconciliationRequest {
        SiteReconciliationRequest {
            site_public_id: "site-public-1".to_string(),
            project_public_id: "project-public-1".to_string(),
            org_public_id: "org-public-1".to_string(),
            request_type: ReconciliationType::Secrets,
            event_ids: vec!["evt-1".to_string()],
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn logging_publisher_always_succeeds() {
        let publisher = LoggingPublisher::new();
        let id1 = publisher
            .publish_site_reconciliation(&sample_request())
            .await
            .unwrap();
        let id2 = publisher
            .publish_site_reconciliation(&sample_request())
            .await
            .unwrap();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn pubsub_publisher_creates_topic_then_publishes() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*:publish$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messageIds": ["msg-1"],
            })))
            .mount(&server)
            .await;

        let publisher = PubSubPublisher::with_base_url(
            "test-project",
            Box::new(crate::token::StaticToken("fake-token".to_string())),
            server.uri(),
        );

        let message_id = publisher
            .publish_site_reconciliation(&sample_request())
            .await
            .unwrap();
        assert_eq!(message_id, "msg-1");
    }

    #[tokio::test]
    async fn pubsub_publisher_treats_409_as_idempotent_topic_creation() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*$"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*:publish$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messageIds": ["msg-2"],
            })))
            .mount(&server)
            .await;

        let publisher = PubSubPublisher::with_base_url(
            "test-project",
            Box::new(crate::token::StaticToken("fake-token".to_string())),
            server.uri(),
        );

        let message_id = publisher
            .publish_site_reconciliation(&sample_request())
            .await
            .unwrap();
        assert_eq!(message_id, "msg-2");
    }

    #[tokio::test]
    async fn pubsub_publisher_surfaces_final_publish_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/v1/projects/.*/topics/.*:publish$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let publisher = PubSubPublisher::with_base_url(
            "test-project",
            Box::new(crate::token::StaticToken("fake-token".to_string())),
            server.uri(),
        );

        let err = publisher
            .publish_site_reconciliation(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::PublishFailed(_)));
    }
}
