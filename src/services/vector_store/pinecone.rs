//! Pinecone vector database backend over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::VectorIndex;
use crate::error::VectorStoreError;
use crate::models::{IndexDescription, IndexEntry, IndexSpec, Metric, PineconeConfig};

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: Metric,
    spec: CreateIndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct CreateIndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: u32,
    metric: Metric,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexEntry],
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Pinecone control-plane and data-plane client.
#[derive(Debug, Clone)]
pub struct PineconeClient {
    client: Client,
    controller_url: String,
}

impl PineconeClient {
    pub fn new(config: &PineconeConfig, api_key: &str) -> Result<Self, VectorStoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| VectorStoreError::Unauthorized(format!("invalid API key: {e}")))?,
        );
        headers.insert(
            "x-pinecone-api-version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of an index's data plane. Hosts come back without a scheme.
    fn data_plane_url(host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }

    async fn error_from(response: Response) -> VectorStoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = format!("status {}: {}", status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                VectorStoreError::Unauthorized(message)
            }
            _ => VectorStoreError::IndexError(message),
        }
    }
}

fn connection_error(e: reqwest::Error) -> VectorStoreError {
    VectorStoreError::ConnectionError(e.to_string())
}

#[async_trait]
impl VectorIndex for PineconeClient {
    async fn describe_index(
        &self,
        name: &str,
    ) -> Result<Option<IndexDescription>, VectorStoreError> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        let response = self.client.get(&url).send().await.map_err(connection_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let model: IndexModel = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        Ok(Some(IndexDescription {
            name: model.name,
            dimension: model.dimension,
            metric: model.metric,
            host: model.host,
            ready: model.status.ready,
        }))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), VectorStoreError> {
        let url = format!("{}/indexes", self.controller_url);
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: CreateIndexSpec {
                serverless: ServerlessSpec {
                    cloud: &spec.hosting.cloud,
                    region: &spec.hosting.region,
                },
            },
        };

        debug!(index = %spec.name, dimension = spec.dimension, metric = %spec.metric, "creating index");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(connection_error)?;

        if response.status() == StatusCode::CONFLICT {
            return Err(VectorStoreError::AlreadyExists {
                name: spec.name.clone(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    async fn upsert(
        &self,
        index: &IndexDescription,
        namespace: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<usize, VectorStoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", Self::data_plane_url(&index.host));
        let request = UpsertRequest {
            vectors: &entries,
            namespace,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::UpsertError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))?;

        Ok(parsed.upserted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostingSpec, Metadata};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(url: &str) -> PineconeClient {
        let config = PineconeConfig {
            controller_url: format!("{url}/"),
            ..Default::default()
        };
        PineconeClient::new(&config, "pc-key").unwrap()
    }

    fn spec() -> IndexSpec {
        IndexSpec {
            name: "medical-chatbot".to_string(),
            dimension: 384,
            metric: Metric::Cosine,
            hosting: HostingSpec {
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
            },
        }
    }

    #[test]
    fn test_data_plane_url() {
        assert_eq!(
            PineconeClient::data_plane_url("idx-abc.svc.pinecone.io"),
            "https://idx-abc.svc.pinecone.io"
        );
        assert_eq!(
            PineconeClient::data_plane_url("http://127.0.0.1:5081/"),
            "http://127.0.0.1:5081"
        );
    }

    #[tokio::test]
    async fn test_describe_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/medical-chatbot"))
            .and(header("Api-Key", "pc-key"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        assert!(client.describe_index("medical-chatbot").await.unwrap().is_none());
        assert!(!client.has_index("medical-chatbot").await.unwrap());
    }

    #[tokio::test]
    async fn test_describe_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/medical-chatbot"))
            .and(header("X-Pinecone-API-Version", "2024-07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "medical-chatbot",
                "dimension": 384,
                "metric": "cosine",
                "host": "medical-chatbot-abc.svc.pinecone.io",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}},
                "status": {"ready": true, "state": "Ready"}
            })))
            .mount(&server)
            .await;

        let description = client(&server.uri())
            .describe_index("medical-chatbot")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(description.dimension, 384);
        assert_eq!(description.metric, Metric::Cosine);
        assert_eq!(description.host, "medical-chatbot-abc.svc.pinecone.io");
        assert!(description.ready);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/medical-chatbot"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .has_index("medical-chatbot")
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_create_index_sends_serverless_spec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(body_partial_json(json!({
                "name": "medical-chatbot",
                "dimension": 384,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri()).create_index(&spec()).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let err = client(&server.uri()).create_index(&spec()).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_upsert_posts_vectors_to_host() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({
                "vectors": [{"id": "a", "values": [0.5, 0.5], "metadata": {"text": "hi"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let description = IndexDescription {
            name: "medical-chatbot".to_string(),
            dimension: 2,
            metric: Metric::Cosine,
            host: server.uri(),
            ready: true,
        };
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!("hi"));
        let entries = vec![IndexEntry {
            id: "a".to_string(),
            values: vec![0.5, 0.5],
            metadata,
        }];

        let written = client(&server.uri())
            .upsert(&description, "", entries)
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_upsert_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Vector dimension 768 does not match"),
            )
            .mount(&server)
            .await;

        let description = IndexDescription {
            name: "medical-chatbot".to_string(),
            dimension: 384,
            metric: Metric::Cosine,
            host: server.uri(),
            ready: true,
        };
        let entries = vec![IndexEntry {
            id: "a".to_string(),
            values: vec![0.1; 768],
            metadata: Metadata::new(),
        }];

        let err = client(&server.uri())
            .upsert(&description, "", entries)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::UpsertError(ref msg) if msg.contains("768")));
    }
}
