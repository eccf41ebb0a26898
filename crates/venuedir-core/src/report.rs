//! Persisted result of one directory scrape.

use std::path::Path;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ReportError;

/// Identifies the extraction pipeline in written reports.
pub const REPORT_METHOD: &str = "venuedir directory convergence (DOM snapshots + intercepted payloads)";

const FALLBACK_FILENAME: &str = "venue_brands.json";

/// JSON document written for each scraped venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandReport {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub total_brands: usize,
    pub brands: Vec<String>,
    pub method: String,
}

impl BrandReport {
    /// Build a report stamped with the current time.
    #[must_use]
    pub fn new(url: &str, brands: Vec<String>) -> Self {
        Self::at(url, brands, Utc::now())
    }

    /// Build a report with an explicit timestamp.
    #[must_use]
    pub fn at(url: &str, brands: Vec<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            scraped_at,
            total_brands: brands.len(),
            brands,
            method: REPORT_METHOD.to_string(),
        }
    }

    /// Pretty-print the report as JSON into `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if encoding fails and
    /// [`ReportError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Derive a report file name from a Maps URL.
///
/// `/maps/place/<Name>/…` URLs yield `<Name>_brands.json`, with the name
/// percent-decoded and its word separators (`+`, `%2B`, spaces) joined by
/// underscores. Short links and anything unparseable fall back to
/// `venue_brands.json`.
#[must_use]
pub fn default_report_filename(url: &str) -> String {
    place_slug(url).map_or_else(
        || FALLBACK_FILENAME.to_string(),
        |place| format!("{place}_brands.json"),
    )
}

fn place_slug(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "place")?;
    let place = segments.next()?;

    let decoded = percent_decode_str(place).decode_utf8().ok()?;
    let slug = decoded
        .split(|c: char| c == '+' || c.is_whitespace())
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    (!slug.is_empty()).then_some(slug)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn report_counts_brands() {
        let report = BrandReport::new("https://maps.app.goo.gl/x", vec!["A".into(), "B".into()]);
        assert_eq!(report.total_brands, 2);
        assert_eq!(report.method, REPORT_METHOD);
    }

    #[test]
    fn write_to_produces_expected_json_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let report = BrandReport::at(
            "https://www.google.com/maps/place/Bullring",
            vec!["Apple".into(), "Zara".into()],
            ts,
        );

        report.write_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["url"], "https://www.google.com/maps/place/Bullring");
        assert_eq!(value["total_brands"], 2);
        assert_eq!(value["brands"][1], "Zara");
        assert_eq!(value["scraped_at"], "2024-05-01T12:30:00Z");

        let back: BrandReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.json");
        let err = BrandReport::new("u", vec![]).write_to(&path).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn filename_from_place_url() {
        assert_eq!(
            default_report_filename(
                "https://www.google.com/maps/place/Westfield+London/@51.5,-0.2,17z/data=!3m1"
            ),
            "Westfield_London_brands.json"
        );
    }

    #[test]
    fn filename_from_encoded_plus() {
        assert_eq!(
            default_report_filename("https://www.google.com/maps/place/Mall%2BOf%2BBerlin"),
            "Mall_Of_Berlin_brands.json"
        );
    }

    #[test]
    fn filename_decodes_non_ascii_place_names() {
        assert_eq!(
            default_report_filename("https://www.google.com/maps/place/Caf%C3%A9+Rouge/@1,2"),
            "Café_Rouge_brands.json"
        );
    }

    #[test]
    fn filename_ignores_query_and_fragment() {
        assert_eq!(
            default_report_filename("https://www.google.com/maps/place/Bullring?hl=en#top"),
            "Bullring_brands.json"
        );
    }

    #[test]
    fn filename_for_place_without_name_falls_back() {
        assert_eq!(
            default_report_filename("https://www.google.com/maps/place/"),
            "venue_brands.json"
        );
    }

    #[test]
    fn filename_for_short_link_falls_back() {
        assert_eq!(
            default_report_filename("https://maps.app.goo.gl/FsGevWWrjvab4tZ9A"),
            "venue_brands.json"
        );
    }

    #[test]
    fn filename_for_garbage_falls_back() {
        assert_eq!(default_report_filename("not a url"), "venue_brands.json");
    }
}
