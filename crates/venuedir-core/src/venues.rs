use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// One venue whose directory should be scraped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub name: String,
    pub url: String,
    pub notes: Option<String>,
}

impl VenueConfig {
    /// Generate a filesystem-safe slug from the venue name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct VenuesFile {
    pub venues: Vec<VenueConfig>,
}

/// Load and validate the venue list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_venues(path: &Path) -> Result<VenuesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::VenuesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_venues(&content)
}

fn parse_venues(content: &str) -> Result<VenuesFile, ConfigError> {
    let venues_file: VenuesFile = serde_yaml::from_str(content)?;
    validate_venues(&venues_file)?;
    Ok(venues_file)
}

fn validate_venues(venues_file: &VenuesFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for venue in &venues_file.venues {
        if venue.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "venue name must be non-empty".to_string(),
            ));
        }

        if !is_web_url(venue.url.trim()) {
            return Err(ConfigError::Validation(format!(
                "venue '{}' has invalid url '{}'; must be an absolute http:// or https:// url",
                venue.name, venue.url
            )));
        }

        let slug = venue.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "venue '{}' produces an empty slug",
                venue.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate venue slug: '{}' (from venue '{}')",
                slug, venue.name
            )));
        }
    }

    Ok(())
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

#[cfg(test)]
#[path = "venues_test.rs"]
mod tests;
