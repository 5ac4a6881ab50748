//! Deterministic token-hashing embedder.
//!
//! Text is segmented into word tokens with `unicode-segmentation`; scripts
//! without word spacing (CJK) segment into single characters, so adjacent-token
//! bigrams are added to capture short compounds. Every token maps to a
//! pseudo-random dense vector seeded from its hash. Token vectors go through
//! the same masked mean pooling and L2 normalization a transformer embedder
//! uses, so texts that share tokens end up close to each other.
//!
//! Vectors are stable for a given build of the crate and its hashing
//! dependencies, which makes the embedder suitable for tests, demos and
//! offline indexes that are queried by the same binary.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unicode_segmentation::UnicodeSegmentation;

use crate::embedding::pooling::{BatchShape, mean_pool_normalized};
use crate::embedding::text_embedder::{TextEmbedder, validate_texts};
use crate::error::{Result, SemsearchError};
use crate::vector::Vector;

const DEFAULT_MAX_TOKENS: usize = 512;
const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Model-free embedder that hashes tokens into dense vectors.
#[derive(Debug, Clone)]
pub struct HashingTextEmbedder {
    dimension: usize,
    max_tokens: usize,
    hasher: ahash::RandomState,
    name: String,
}

impl HashingTextEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    ///
    /// Fails with `ModelUnavailable` when `dimension` is 0.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(SemsearchError::model_unavailable(
                "hashing embedder needs a positive dimension",
            ));
        }
        Ok(Self {
            dimension,
            max_tokens: DEFAULT_MAX_TOKENS,
            hasher: ahash::RandomState::with_seeds(
                HASH_SEEDS[0],
                HASH_SEEDS[1],
                HASH_SEEDS[2],
                HASH_SEEDS[3],
            ),
            name: format!("hashing-{dimension}"),
        })
    }

    /// Truncate token sequences to at most `max_tokens` tokens.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// Split text into lowercase unigram and bigram tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut words: Vec<&str> = Vec::new();
        for word in lowered.unicode_words() {
            if word.chars().any(is_cjk) {
                words.extend(word.graphemes(true));
            } else {
                words.push(word);
            }
        }
        if words.is_empty() {
            // Punctuation or symbols only: fall back to grapheme clusters.
            words = lowered
                .trim()
                .graphemes(true)
                .filter(|g| !g.trim().is_empty())
                .collect();
        }

        let mut tokens: Vec<String> = words.iter().map(|word| format!("u:{word}")).collect();
        tokens.extend(words.windows(2).map(|pair| format!("b:{}{}", pair[0], pair[1])));
        tokens.truncate(self.max_tokens);
        tokens
    }

    fn token_vector(&self, token: &str, out: &mut [f32]) {
        let seed = self.hasher.hash_one(token);
        let mut rng = StdRng::seed_from_u64(seed);
        for value in out.iter_mut() {
            *value = rng.random::<f32>() * 2.0 - 1.0;
        }
    }
}

/// Han, kana and hangul characters, which are written without word spacing.
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30ff}'
            | '\u{3400}'..='\u{4dbf}'
            | '\u{4e00}'..='\u{9fff}'
            | '\u{ac00}'..='\u{d7af}'
            | '\u{f900}'..='\u{faff}')
}

#[async_trait]
impl TextEmbedder for HashingTextEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        validate_texts(texts)?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let tokenized: Vec<Vec<String>> = texts.iter().map(|text| self.tokenize(text)).collect();
        if let Some(position) = tokenized.iter().position(Vec::is_empty) {
            return Err(SemsearchError::encoding(format!(
                "input {position} produced no tokens"
            )));
        }

        let seq_len = tokenized.iter().map(Vec::len).max().unwrap_or(0);
        let shape = BatchShape::new(texts.len(), seq_len, self.dimension);
        let mut embeddings = vec![0.0f32; shape.batch * seq_len * self.dimension];
        let mut mask = vec![0.0f32; shape.batch * seq_len];

        for (row, tokens) in tokenized.iter().enumerate() {
            for (position, token) in tokens.iter().enumerate() {
                let index = row * seq_len + position;
                mask[index] = 1.0;
                let start = index * self.dimension;
                self.token_vector(token, &mut embeddings[start..start + self.dimension]);
            }
        }

        mean_pool_normalized(&embeddings, &mask, shape)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
