//! Vector tuples exchanged between the embedding session and the index

use serde::{Deserialize, Serialize};

use crate::error::{Result, SemsearchError};

/// Fixed-width embedding produced by one model
pub type EmbeddingVector = Vec<f32>;

/// A labeled vector ready to be indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedItem {
    /// Unique within one index
    pub id: String,
    pub title: String,
    pub url: String,
    pub embedding: EmbeddingVector,
}

impl IndexedItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        embedding: EmbeddingVector,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            embedding,
        }
    }

    /// Pair each phrase with its embedding.
    ///
    /// Item `i` gets id `"i"`, the phrase as title and `/path/i` as url.
    pub fn from_phrases<S: AsRef<str>>(
        phrases: &[S],
        embeddings: Vec<EmbeddingVector>,
    ) -> Result<Vec<Self>> {
        if phrases.len() != embeddings.len() {
            return Err(SemsearchError::invalid_input(format!(
                "{} phrases but {} embeddings",
                phrases.len(),
                embeddings.len()
            )));
        }

        Ok(phrases
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(idx, (phrase, embedding))| {
                Self::new(
                    idx.to_string(),
                    phrase.as_ref(),
                    format!("/path/{}", idx),
                    embedding,
                )
            })
            .collect())
    }
}

/// One hit returned by a search, nearest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchNeighbor {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Cosine distance to the query, in [0, 2]
    pub distance: f32,
}

/// Ranked search output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Ascending by distance, ties in insertion order
    pub neighbors: Vec<SearchNeighbor>,
    /// False when an approximate (HNSW) traversal produced the neighbors
    pub exact: bool,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self {
            neighbors: Vec::new(),
            exact: true,
        }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Nearest neighbor, if any
    pub fn first(&self) -> Option<&SearchNeighbor> {
        self.neighbors.first()
    }
}

/// Split one flat buffer into `dimension`-wide vectors
pub fn split_flat(flat: &[f32], dimension: usize) -> Result<Vec<EmbeddingVector>> {
    if dimension == 0 {
        return Err(SemsearchError::invalid_input("dimension must be non-zero"));
    }
    if flat.len() % dimension != 0 {
        return Err(SemsearchError::invalid_input(format!(
            "buffer of {} floats is not a multiple of dimension {}",
            flat.len(),
            dimension
        )));
    }

    Ok(flat.chunks_exact(dimension).map(<[f32]>::to_vec).collect())
}
