//! Candle-based text embedder implementation.
//!
//! Runs a BERT sentence-transformer locally with the HuggingFace Candle
//! framework. Requires the `embeddings-candle` feature to be enabled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use log::info;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use crate::embedding::pooling::MASK_SUM_EPSILON;
use crate::embedding::text_embedder::{TextEmbedder, validate_texts};
use crate::error::{Result, SemsearchError};
use crate::vector::Vector;

const MAX_SEQUENCE_LENGTH: usize = 512;

/// Candle-based text embedder using BERT models.
///
/// # Examples
///
/// ```no_run
/// use semsearch::embedding::text_embedder::TextEmbedder;
/// use semsearch::embedding::candle_text_embedder::CandleTextEmbedder;
///
/// # async fn example() -> semsearch::error::Result<()> {
/// let embedder = CandleTextEmbedder::new(
///     "sentence-transformers/paraphrase-multilingual-mpnet-base-v2"
/// )?;
///
/// let vectors = embedder.embed_batch(&["笔记本电脑", "医生的办公室"]).await?;
/// println!("Embedding dimension: {}", embedder.dimension());
/// # Ok(())
/// # }
/// ```
pub struct CandleTextEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_name: String,
}

impl std::fmt::Debug for CandleTextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleTextEmbedder")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

fn unavailable<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> SemsearchError {
    move |e| SemsearchError::model_unavailable(format!("{context}: {e}"))
}

fn encoding<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> SemsearchError {
    move |e| SemsearchError::encoding(format!("{context}: {e}"))
}

impl CandleTextEmbedder {
    /// Load a model from a local directory or the HuggingFace Hub.
    ///
    /// `model` is either a directory holding `config.json`,
    /// `model.safetensors` and `tokenizer.json`, or a Hub identifier such as
    /// `"sentence-transformers/all-MiniLM-L6-v2"`. Every failure while
    /// acquiring the model is reported as `ModelUnavailable`.
    pub fn new(model: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0).map_err(unavailable("device setup failed"))?;

        let (config_path, weights_path, tokenizer_path) = if Path::new(model).is_dir() {
            let dir = PathBuf::from(model);
            (
                dir.join("config.json"),
                dir.join("model.safetensors"),
                dir.join("tokenizer.json"),
            )
        } else {
            let cache_dir = std::env::var("HF_HOME")
                .or_else(|_| {
                    std::env::var("HOME").map(|home| format!("{home}/.cache/huggingface"))
                })
                .unwrap_or_else(|_| "/tmp/huggingface".to_string());
            let api = ApiBuilder::new()
                .with_cache_dir(cache_dir.into())
                .build()
                .map_err(unavailable("HF API initialization failed"))?;
            let repo = api.model(model.to_string());
            (
                repo.get("config.json")
                    .map_err(unavailable("config download failed"))?,
                repo.get("model.safetensors")
                    .map_err(unavailable("weights download failed"))?,
                repo.get("tokenizer.json")
                    .map_err(unavailable("tokenizer download failed"))?,
            )
        };

        let config_str =
            std::fs::read_to_string(config_path).map_err(unavailable("config read failed"))?;
        let config: Config =
            serde_json::from_str(&config_str).map_err(unavailable("config parse failed"))?;

        // SAFETY: the weights file is memory-mapped read-only and kept alive by the VarBuilder.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(unavailable("VarBuilder creation failed"))?
        };
        let bert = BertModel::load(vb, &config).map_err(unavailable("model load failed"))?;

        let mut tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(unavailable("tokenizer load failed"))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(unavailable("tokenizer truncation setup failed"))?;

        info!(
            "loaded embedding model {model} (dimension {})",
            config.hidden_size
        );

        Ok(Self {
            model: bert,
            tokenizer,
            device,
            dimension: config.hidden_size,
            model_name: model.to_string(),
        })
    }

    /// Masked mean pooling followed by L2 normalization.
    ///
    /// `embeddings` is `(batch, seq, hidden)`, `attention_mask` is `(batch, seq)`.
    fn pool(&self, embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let map = encoding("pooling failed");
        let mask = attention_mask
            .to_dtype(DType::F32)
            .and_then(|m| m.unsqueeze(2))
            .and_then(|m| m.broadcast_as(embeddings.shape()))
            .map_err(encoding("mask expansion failed"))?;

        let summed = embeddings
            .mul(&mask)
            .and_then(|t| t.sum(1))
            .map_err(encoding("masked sum failed"))?;
        let counts = mask
            .sum(1)
            .and_then(|c| c.maximum(MASK_SUM_EPSILON as f64))
            .map_err(encoding("mask count failed"))?;
        let mean = summed.div(&counts).map_err(map)?;

        let norms = mean
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.maximum(MASK_SUM_EPSILON as f64))
            .map_err(encoding("norm failed"))?;
        mean.broadcast_div(&norms)
            .map_err(encoding("normalization failed"))
    }
}

#[async_trait]
impl TextEmbedder for CandleTextEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        validate_texts(texts)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(encoding("tokenization failed"))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding_row in &encodings {
            ids.push(
                Tensor::new(encoding_row.get_ids(), &self.device)
                    .map_err(encoding("tensor creation failed"))?,
            );
            masks.push(
                Tensor::new(encoding_row.get_attention_mask(), &self.device)
                    .map_err(encoding("tensor creation failed"))?,
            );
        }
        let input_ids = Tensor::stack(&ids, 0).map_err(encoding("batching failed"))?;
        let attention_mask = Tensor::stack(&masks, 0).map_err(encoding("batching failed"))?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(encoding("tensor creation failed"))?;

        let embeddings = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(encoding("model forward failed"))?;

        let pooled = self.pool(&embeddings, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled
            .to_vec2()
            .map_err(encoding("tensor readback failed"))?;
        Ok(rows.into_iter().map(Vector::new).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
