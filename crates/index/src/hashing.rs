//! Deterministic trigram embedder for tests and air-gapped setups.
//!
//! It is lexical only: partial names match their titles, but synonyms and
//! abbreviations do not. The `local` sentence model is the default.
//!
//! Every lowercased word is padded with spaces and split into character
//! trigrams; each trigram is hashed with FNV-1a into one of `dimensions`
//! buckets and the resulting count vector is L2-normalized. Shared trigrams
//! give partial names ("intro") real similarity to full titles
//! ("Introduction to Machine Learning") without any model download.

use async_trait::async_trait;
use lectern_core::embedding::Embedder;
use lectern_core::error::IndexError;

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

pub struct HashingEmbedder {
    name: String,
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            name: format!("fnv1a-trigram-{dimensions}"),
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars().flat_map(char::to_lowercase))
                .chain(std::iter::once(' '))
                .collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                let idx = (fnv1a64(&gram) % self.dimensions as u64) as usize;
                v[idx] += 1.0;
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn fnv1a64(s: &str) -> u64 {
    let mut h = FNV_OFFSET;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;

    #[test]
    fn fnv_known_value() {
        assert_eq!(fnv1a64(""), FNV_OFFSET);
        assert_eq!(fnv1a64("a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn vectors_are_unit_length() {
        let v = HashingEmbedder::default().embed_text("Building Towards Computer Use");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(v.len(), 384);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(16).embed_text("  ... ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed_text("Intro to Testing!"), e.embed_text("intro TO testing"));
    }

    #[test]
    fn partial_name_is_closer_to_its_course() {
        let e = HashingEmbedder::default();
        let query = e.embed_text("intro");
        let ml = e.embed_text("Introduction to Machine Learning");
        let mcp = e.embed_text("MCP: Build Rich-Context AI Apps with Anthropic");
        assert!(cosine_similarity(&query, &ml) > cosine_similarity(&query, &mcp));
        assert!(cosine_similarity(&query, &ml) > 0.25);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let e = HashingEmbedder::new(64);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let out = e.embed(&texts).await.unwrap();
        assert_eq!(out[0], e.embed_text("alpha"));
        assert_eq!(out[1], e.embed_text("beta"));
        assert_eq!(e.embed_one("beta").await.unwrap(), out[1]);
    }
}
