//! Entity categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category an extracted entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    People,
    Concepts,
    Tools,
    Locations,
    TemporalEvents,
}

impl EntityCategory {
    /// All categories, in extraction order
    pub const ALL: [EntityCategory; 5] = [
        Self::People,
        Self::Concepts,
        Self::Tools,
        Self::Locations,
        Self::TemporalEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Concepts => "concepts",
            Self::Tools => "tools",
            Self::Locations => "locations",
            Self::TemporalEvents => "temporal_events",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "people" | "person" => Some(Self::People),
            "concepts" | "concept" => Some(Self::Concepts),
            "tools" | "tool" => Some(Self::Tools),
            "locations" | "location" => Some(Self::Locations),
            "temporal_events" | "temporal_event" | "temporal" => Some(Self::TemporalEvents),
            _ => None,
        }
    }

    /// Label used for graph entity nodes of this category
    pub fn node_label(&self) -> &'static str {
        match self {
            Self::People => "Person",
            Self::Concepts => "Concept",
            Self::Tools => "Tool",
            Self::Locations => "Location",
            Self::TemporalEvents => "TemporalEvent",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
