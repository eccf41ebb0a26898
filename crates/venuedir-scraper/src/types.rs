//! Value types shared by the directory extraction pipeline.

use serde::{Deserialize, Serialize};

/// One brand/store entry observed in a venue directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryCard {
    /// Display name, trimmed and never empty.
    pub name: String,
    /// Place link or internal place id. Only used for de-duplication.
    pub link: Option<String>,
    pub category: Option<String>,
    pub floor: Option<String>,
}

impl DirectoryCard {
    /// Builds a card from a raw name, returning `None` when the trimmed name is empty.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            link: None,
            category: None,
            floor: None,
        })
    }

    /// Identity used when merging evidence from several channels.
    #[must_use]
    pub fn entity_key(&self) -> (String, Option<String>, Option<String>) {
        (self.name.clone(), self.category.clone(), self.floor.clone())
    }
}

/// Summary of one scroll convergence run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollTelemetry {
    pub scrolls_performed: u32,
    /// Last observed child count of the scroll container.
    pub final_card_count: u64,
    pub sentinel_triggered: bool,
    pub responses_observed: usize,
}

/// Everything one extraction produced.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScrape {
    /// Sorted, de-duplicated brand names.
    pub brands: Vec<String>,
    /// Merged cards in first-seen order.
    pub cards: Vec<DirectoryCard>,
    pub telemetry: ScrollTelemetry,
    /// `true` when the extraction deadline cut scrolling short.
    pub timed_out: bool,
}
