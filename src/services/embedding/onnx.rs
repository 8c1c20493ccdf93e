use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Ix3;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use super::{Embedder, normalize};
use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, Pooling};

/// Sentence-transformer running in-process on ONNX Runtime.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_name: String,
    pooling: Pooling,
    batch_size: usize,
    uses_token_type_ids: bool,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from the configured model directory.
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Self::load_from(config, &config.model_dir)
    }

    pub fn load_from(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(format!(
                "{} (download the ONNX export of {} into {})",
                model_path.display(),
                config.model,
                model_dir.display()
            )));
        }

        info!(model = %config.model, path = %model_path.display(), "loading embedding model");

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        // Truncate to the model's context window
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens as usize,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_name: config.model.clone(),
            pooling: config.pooling,
            batch_size: (config.batch_size as usize).max(1),
            uses_token_type_ids,
        })
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for (j, ((&id, &m), &t)) in ids.iter().zip(mask).zip(types).enumerate() {
                input_ids[i * max_len + j] = i64::from(id);
                attention_mask[i * max_len + j] = i64::from(m);
                token_type_ids[i * max_len + j] = i64::from(t);
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::InferenceError("session lock poisoned".to_string()))?;

        let run_result = if self.uses_token_type_ids {
            let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        };
        let outputs =
            run_result.map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let shape = output_array.shape().to_vec();

        let embeddings = match shape.len() {
            3 => {
                let hidden = output_array
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| EmbeddingError::InferenceError(e.to_string()))?;
                let dimension = shape[2];
                (0..batch_size)
                    .map(|i| {
                        let mask = &attention_mask[i * max_len..(i + 1) * max_len];
                        let pooled = match self.pooling {
                            Pooling::Mean => {
                                let mut sum = vec![0f32; dimension];
                                let mut count = 0f32;
                                for (j, &m) in mask.iter().enumerate() {
                                    if m == 0 {
                                        continue;
                                    }
                                    count += 1.0;
                                    for (d, value) in sum.iter_mut().enumerate() {
                                        *value += hidden[[i, j, d]];
                                    }
                                }
                                let count = count.max(1.0);
                                sum.into_iter().map(|v| v / count).collect::<Vec<f32>>()
                            }
                            Pooling::LastToken => {
                                let seq_len = mask.iter().filter(|&&m| m != 0).count();
                                let last_idx = seq_len.saturating_sub(1);
                                (0..dimension).map(|d| hidden[[i, last_idx, d]]).collect()
                            }
                        };
                        normalize(&pooled)
                    })
                    .collect()
            }
            // Model already emits one sentence embedding per input
            2 => (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..shape[1]).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect(),
            _ => {
                return Err(EmbeddingError::InferenceError(format!(
                    "unexpected output shape: {:?}",
                    shape
                )));
            }
        };

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(batch = batch.len(), "running local embedding batch");
            all_embeddings.extend(self.embed_single_batch(batch)?);
        }
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
