//! Text chunking with overlap for embedding.

use crate::models::{Chunk, FilteredDocument, IngestConfig};

/// Text chunker that splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters shared by consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker. An overlap not smaller than the chunk size is clamped
    /// so the window always advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::from_config(&IngestConfig::default())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk every document, in order.
    pub fn split_documents(&self, documents: &[FilteredDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .enumerate()
            .flat_map(|(idx, doc)| self.chunk(idx, doc))
            .collect()
    }

    /// Chunk one document into overlapping segments. `document_index` is the
    /// document's position in the ingested sequence and feeds the chunk ids.
    ///
    /// Whitespace runs longer than two characters are collapsed first, so no
    /// window is blank and every pair of neighbours shares exactly `overlap`
    /// characters. Offsets index into the collapsed text.
    pub fn chunk(&self, document_index: usize, document: &FilteredDocument) -> Vec<Chunk> {
        let content = &collapse_whitespace(&document.content);
        let source = document.source().unwrap_or_default();

        if content.is_empty() {
            return Vec::new();
        }

        let total_chars = content.chars().count();

        // If content fits, return it as a single chunk
        if total_chars <= self.chunk_size {
            return vec![Chunk {
                id: Chunk::generate_id(source, document_index, 0, content),
                content: content.to_string(),
                metadata: document.metadata.clone(),
                chunk_index: 0,
                total_chunks: 1,
                start_offset: 0,
                end_offset: total_chars as u64,
            }];
        }

        let windows = self.split_with_overlap(content);
        let total_chunks = windows.len() as u32;

        windows
            .into_iter()
            .enumerate()
            .map(|(idx, (text, start, end))| Chunk {
                id: Chunk::generate_id(source, document_index, idx as u32, &text),
                content: text,
                metadata: document.metadata.clone(),
                chunk_index: idx as u32,
                total_chunks,
                start_offset: start as u64,
                end_offset: end as u64,
            })
            .collect()
    }

    /// Split content into windows of at most `chunk_size` characters, each
    /// starting `overlap` characters before the end of the previous one.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, usize, usize)> {
        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();
        let mut windows = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let mut adjusted_end = self.find_break_point(&chars, end, total_chars);

            // The next window must start after this one
            if adjusted_end <= start + self.overlap {
                adjusted_end = end;
            }

            windows.push((chars[start..adjusted_end].iter().collect(), start, adjusted_end));

            if adjusted_end >= total_chars {
                break;
            }

            start = adjusted_end - self.overlap;
        }

        windows
    }

    /// Find a natural break point near the target end position.
    fn find_break_point(&self, chars: &[char], target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        // Look for a natural break point within the last 20% of the chunk
        let search_start = target_end.saturating_sub(self.chunk_size / 5);
        let search_range = &chars[search_start..target_end];

        // Priority: double newline > single newline > period+space > space
        let mut best_break = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range.get(i - 1) == Some(&'\n') {
                        best_break = Some(pos + 1);
                    }
                    last_newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if search_range.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    last_space = Some(pos + 1);
                }
                _ => {}
            }
        }

        best_break
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}

/// Trim `text` and shrink each whitespace run longer than two characters to
/// a paragraph break, a line break or a space, depending on how many newlines
/// it holds.
fn collapse_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut run = String::new();

    for c in text.trim().chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            if run.chars().count() <= 2 {
                output.push_str(&run);
            } else {
                match run.matches('\n').count() {
                    0 => output.push(' '),
                    1 => output.push('\n'),
                    _ => output.push_str("\n\n"),
                }
            }
            run.clear();
        }
        output.push(c);
    }

    output
}
