//! Reduce raw documents to their content and a whitelisted metadata subset.

use crate::error::IndexError;
use crate::models::{FilteredDocument, METADATA_WHITELIST, Metadata, RawDocument};

/// Keep only the whitelisted metadata keys of `doc`.
///
/// A document without content is rejected rather than passed on to produce
/// an empty chunk.
pub fn filter_to_minimal(doc: RawDocument) -> Result<FilteredDocument, IndexError> {
    if doc.content.trim().is_empty() {
        return Err(IndexError::EmptyContent {
            source_path: doc.source().unwrap_or("<unknown>").to_string(),
        });
    }

    let metadata: Metadata = doc
        .metadata
        .into_iter()
        .filter(|(key, _)| METADATA_WHITELIST.contains(&key.as_str()))
        .collect();

    Ok(FilteredDocument {
        content: doc.content,
        metadata,
    })
}

/// Filter a whole document sequence, preserving order.
pub fn filter_documents(docs: Vec<RawDocument>) -> Result<Vec<FilteredDocument>, IndexError> {
    docs.into_iter().map(filter_to_minimal).collect()
}
