//! Static registry of loadable embedding models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SemsearchError;

/// Models a session can load, each backed by a fastembed ONNX artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AvailableModel {
    /// BAAI bge-small-en-v1.5 (384d)
    #[default]
    BgeSmallEnV15,
    /// Quantized bge-small-en-v1.5 (384d)
    BgeSmallEnV15Q,
    /// sentence-transformers all-MiniLM-L6-v2 (384d)
    AllMiniLmL6V2,
    /// Quantized all-MiniLM-L6-v2 (384d)
    AllMiniLmL6V2Q,
    /// BAAI bge-base-en-v1.5 (768d)
    BgeBaseEnV15,
    /// BAAI bge-large-en-v1.5 (1024d)
    BgeLargeEnV15,
}

impl AvailableModel {
    /// Every registered model
    pub const ALL: [AvailableModel; 6] = [
        Self::BgeSmallEnV15,
        Self::BgeSmallEnV15Q,
        Self::AllMiniLmL6V2,
        Self::AllMiniLmL6V2Q,
        Self::BgeBaseEnV15,
        Self::BgeLargeEnV15,
    ];

    /// Canonical model name
    pub fn name(&self) -> &'static str {
        match self {
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::BgeSmallEnV15Q => "bge-small-en-v1.5-q",
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
            Self::AllMiniLmL6V2Q => "all-minilm-l6-v2-q",
            Self::BgeBaseEnV15 => "bge-base-en-v1.5",
            Self::BgeLargeEnV15 => "bge-large-en-v1.5",
        }
    }

    /// Output dimensionality of the model
    pub fn dimension(&self) -> usize {
        match self {
            Self::BgeSmallEnV15
            | Self::BgeSmallEnV15Q
            | Self::AllMiniLmL6V2
            | Self::AllMiniLmL6V2Q => 384,
            Self::BgeBaseEnV15 => 768,
            Self::BgeLargeEnV15 => 1024,
        }
    }

    pub(crate) fn to_fastembed(self) -> fastembed::EmbeddingModel {
        match self {
            Self::BgeSmallEnV15 => fastembed::EmbeddingModel::BGESmallENV15,
            Self::BgeSmallEnV15Q => fastembed::EmbeddingModel::BGESmallENV15Q,
            Self::AllMiniLmL6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
            Self::AllMiniLmL6V2Q => fastembed::EmbeddingModel::AllMiniLML6V2Q,
            Self::BgeBaseEnV15 => fastembed::EmbeddingModel::BGEBaseENV15,
            Self::BgeLargeEnV15 => fastembed::EmbeddingModel::BGELargeENV15,
        }
    }

    fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AvailableModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AvailableModel {
    type Err = SemsearchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "bge-small-en-v1.5" | "bgesmallenv15" | "baai/bge-small-en-v1.5" => {
                Ok(Self::BgeSmallEnV15)
            }
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => Ok(Self::BgeSmallEnV15Q),
            "all-minilm-l6-v2" | "allminilml6v2" | "sentence-transformers/all-minilm-l6-v2" => {
                Ok(Self::AllMiniLmL6V2)
            }
            "all-minilm-l6-v2-q" | "allminilml6v2q" => Ok(Self::AllMiniLmL6V2Q),
            "bge-base-en-v1.5" | "bgebaseenv15" | "baai/bge-base-en-v1.5" => Ok(Self::BgeBaseEnV15),
            "bge-large-en-v1.5" | "bgelargeenv15" | "baai/bge-large-en-v1.5" => {
                Ok(Self::BgeLargeEnV15)
            }
            _ => Err(SemsearchError::UnknownModel(format!(
                "{}. Supported models: {}",
                name,
                Self::supported_names()
            ))),
        }
    }
}

impl Serialize for AvailableModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for AvailableModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
