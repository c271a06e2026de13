//! Deterministic stand-in model shared by the integration tests.
//!
//! Words map onto a handful of concept axes (weather, mood, animal, ...), so
//! phrases about the same topic land close together without any real model.

#![allow(dead_code)]

use std::sync::Arc;

use semsearch_core::{
    AvailableModel, BackendLoader, EmbeddingBackend, EmbeddingVector, Result, SemsearchError,
    SessionConfig,
};

pub const PHRASES: [&str; 3] = [
    "That is a very happy Person",
    "That is a Happy Dog",
    "Today is a sunny day",
];

pub const QUERY: &str = "Is it summer yet?";

const WEATHER: usize = 0;
const MOOD: usize = 1;
const ANIMAL: usize = 2;
const PERSON: usize = 3;
const TIME: usize = 4;
const BIAS: usize = 5;

fn axis(word: &str) -> Option<usize> {
    match word {
        "sunny" | "summer" | "sun" | "rain" | "warm" | "weather" => Some(WEATHER),
        "happy" | "sad" | "glad" => Some(MOOD),
        "dog" | "cat" | "bird" => Some(ANIMAL),
        "person" | "people" | "man" | "woman" => Some(PERSON),
        "today" | "day" | "yet" | "tomorrow" => Some(TIME),
        _ => None,
    }
}

pub struct ConceptBackend {
    dimension: usize,
}

impl ConceptBackend {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > BIAS);
        Self { dimension }
    }

    pub fn encode(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0; self.dimension];
        vector[BIAS] = 0.1;
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(axis) = axis(word) {
                vector[axis] += 1.0;
            }
        }
        vector
    }
}

impl EmbeddingBackend for ConceptBackend {
    fn name(&self) -> &str {
        "concept"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }
}

/// Loads a [`ConceptBackend`] as wide as the requested registry model
pub struct ConceptLoader;

impl BackendLoader for ConceptLoader {
    fn load(
        &self,
        model: AvailableModel,
        _config: &SessionConfig,
    ) -> Result<Arc<dyn EmbeddingBackend>> {
        Ok(Arc::new(ConceptBackend::new(model.dimension())))
    }
}

/// Always fails, as an unreachable model hub would
pub struct OfflineLoader;

impl BackendLoader for OfflineLoader {
    fn load(
        &self,
        model: AvailableModel,
        _config: &SessionConfig,
    ) -> Result<Arc<dyn EmbeddingBackend>> {
        Err(SemsearchError::model_load(format!(
            "failed to fetch {}: network unreachable",
            model
        )))
    }
}
