use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form document metadata. Ordered so serialized output is stable.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Metadata keys that survive filtering.
pub const METADATA_WHITELIST: &[&str] = &["source"];

/// Metadata key under which the chunk text is stored in the index.
pub const TEXT_KEY: &str = "text";

/// A page of extracted text straight from the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub content: String,
    pub metadata: Metadata,
}

/// A document reduced to its content and whitelisted metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredDocument {
    pub content: String,
    pub metadata: Metadata,
}

/// A bounded slice of a filtered document, the unit of embedding and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Character offsets into the parent content.
    pub start_offset: u64,
    pub end_offset: u64,
}

impl RawDocument {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The `source` metadata value, if it is a string.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

impl FilteredDocument {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }

    /// View this document as raw input again, e.g. to re-apply the filter.
    pub fn to_raw(&self) -> RawDocument {
        RawDocument::new(self.content.clone(), self.metadata.clone())
    }
}

impl Chunk {
    /// Stable id derived from where the chunk came from and what it holds, so
    /// re-ingesting the same input addresses the same index entries.
    pub fn generate_id(
        source: &str,
        document_index: usize,
        chunk_index: u32,
        content: &str,
    ) -> String {
        use uuid::Uuid;
        let checksum = crate::utils::calculate_checksum(content);
        let name = format!("{source}:{document_index}:{chunk_index}:{checksum}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_generate_id() {
        let id = Chunk::generate_id("data/a.pdf", 0, 5, "hello");
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);

        let same = Chunk::generate_id("data/a.pdf", 0, 5, "hello");
        assert_eq!(id, same);

        assert_ne!(id, Chunk::generate_id("data/a.pdf", 0, 6, "hello"));
        assert_ne!(id, Chunk::generate_id("data/a.pdf", 1, 5, "hello"));
        assert_ne!(id, Chunk::generate_id("data/b.pdf", 0, 5, "hello"));
        assert_ne!(id, Chunk::generate_id("data/a.pdf", 0, 5, "hello!"));
    }

    #[test]
    fn test_source_accessor() {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("data/guide.pdf"));
        metadata.insert("page".to_string(), json!(3));
        let doc = RawDocument::new("text", metadata);
        assert_eq!(doc.source(), Some("data/guide.pdf"));

        let doc = RawDocument::new("text", Metadata::new());
        assert_eq!(doc.source(), None);
    }
}
