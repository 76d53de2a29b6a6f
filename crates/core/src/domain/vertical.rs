use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host application domain. Selects the persona and the catalog filter for a
/// pipeline run. One capability set exists per vertical; dispatch is a plain
/// enum match rather than a registry of live objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Gaming,
    Cooking,
    Productivity,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported vertical `{0}` (expected gaming|cooking|productivity)")]
pub struct UnknownVertical(pub String);

impl std::str::FromStr for Vertical {
    type Err = UnknownVertical;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gaming" => Ok(Self::Gaming),
            "cooking" => Ok(Self::Cooking),
            "productivity" => Ok(Self::Productivity),
            other => Err(UnknownVertical(other.to_string())),
        }
    }
}

impl Vertical {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Cooking => "cooking",
            Self::Productivity => "productivity",
        }
    }

    /// Persona the placement orchestrator speaks as when selecting a product.
    pub fn orchestrator_persona(&self) -> &'static str {
        match self {
            Self::Gaming => "master storyteller and Game Master",
            Self::Cooking => "seasoned chef and food expert",
            Self::Productivity => "helpful senior colleague or specialist",
        }
    }

    /// Persona the narrative generator adopts for the final reply.
    pub fn host_persona(&self) -> &'static str {
        match self {
            Self::Gaming => "a world-class Game Master for a text-based RPG",
            Self::Cooking => "a friendly and encouraging cooking assistant",
            Self::Productivity => "a helpful senior colleague",
        }
    }
}
