//! Makes sure the target index exists before anything is written to it.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use super::vector_store::VectorIndex;
use crate::error::VectorStoreError;
use crate::models::{IndexDescription, IndexSpec};

/// How often readiness is polled after creating an index.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Whether the index was already there or created by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionOutcome {
    Existing,
    Created,
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionOutcome::Existing => write!(f, "existing"),
            ProvisionOutcome::Created => write!(f, "created"),
        }
    }
}

/// Create the index described by `spec` unless one with that name exists,
/// then wait until it reports ready.
///
/// An existing index is used as-is even if its dimension or metric differ
/// from `spec`.
pub async fn ensure_index(
    index: &dyn VectorIndex,
    spec: &IndexSpec,
    ready_timeout: Duration,
    poll_interval: Duration,
) -> Result<(ProvisionOutcome, IndexDescription), VectorStoreError> {
    let outcome = if index.has_index(&spec.name).await? {
        debug!(index = %spec.name, "index already exists");
        ProvisionOutcome::Existing
    } else {
        info!(
            index = %spec.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            cloud = %spec.hosting.cloud,
            region = %spec.hosting.region,
            "creating index"
        );
        index.create_index(spec).await?;
        ProvisionOutcome::Created
    };

    let description = wait_until_ready(index, &spec.name, ready_timeout, poll_interval).await?;
    Ok((outcome, description))
}

async fn wait_until_ready(
    index: &dyn VectorIndex,
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<IndexDescription, VectorStoreError> {
    let started = Instant::now();
    loop {
        match index.describe_index(name).await? {
            Some(description) if description.ready => return Ok(description),
            Some(_) => debug!(index = %name, "waiting for index to become ready"),
            None => debug!(index = %name, "index not visible yet"),
        }

        if started.elapsed() >= timeout {
            return Err(VectorStoreError::NotReady {
                name: name.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HostingSpec, Metric};
    use crate::services::vector_store::tests::MemoryIndex;
    use std::sync::atomic::Ordering;

    const FAST: Duration = Duration::from_millis(1);

    fn spec(dimension: u32) -> IndexSpec {
        IndexSpec {
            name: "medical-chatbot".to_string(),
            dimension,
            metric: Metric::Cosine,
            hosting: HostingSpec {
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_creates_missing_index_once() {
        let index = MemoryIndex::default();
        let (outcome, description) =
            ensure_index(&index, &spec(384), Duration::from_secs(1), FAST)
                .await
                .unwrap();

        assert_eq!(outcome, ProvisionOutcome::Created);
        assert_eq!(description.dimension, 384);
        assert_eq!(index.create_calls.load(Ordering::SeqCst), 1);
        assert!(index.has_index("medical-chatbot").await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_index_is_not_recreated() {
        let index = MemoryIndex::with_index(&spec(384));
        let (outcome, _) =
            ensure_index(&index, &spec(384), Duration::from_secs(1), FAST)
                .await
                .unwrap();

        assert_eq!(outcome, ProvisionOutcome::Existing);
        assert_eq!(index.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_index_keeps_its_dimension() {
        let index = MemoryIndex::with_index(&spec(768));
        let (outcome, description) =
            ensure_index(&index, &spec(384), Duration::from_secs(1), FAST)
                .await
                .unwrap();

        assert_eq!(outcome, ProvisionOutcome::Existing);
        assert_eq!(description.dimension, 768);
    }

    #[tokio::test]
    async fn test_waits_for_readiness() {
        let index = MemoryIndex::default();
        index.not_ready_polls.store(3, Ordering::SeqCst);

        let (_, description) =
            ensure_index(&index, &spec(384), Duration::from_secs(5), FAST)
                .await
                .unwrap();

        assert!(description.ready);
        assert_eq!(index.not_ready_polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_readiness_timeout() {
        let index = MemoryIndex::default();
        index.not_ready_polls.store(usize::MAX, Ordering::SeqCst);

        let err = ensure_index(&index, &spec(384), Duration::from_millis(20), FAST)
            .await
            .unwrap_err();

        assert!(matches!(err, VectorStoreError::NotReady { ref name, .. } if name == "medical-chatbot"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(ProvisionOutcome::Created.to_string(), "created");
        assert_eq!(ProvisionOutcome::Existing.to_string(), "existing");
    }
}
