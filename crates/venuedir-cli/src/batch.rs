//! `batch` command: scrape every venue in the venues file.
//!
//! Venues run with bounded concurrency over one browser session. A venue
//! that fails is logged and counted; the rest of the batch carries on.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use venuedir_core::{load_venues, AppConfig, BrandReport, VenueConfig};
use venuedir_scraper::DirectoryScraper;

use crate::scrape::{launch_scraper, shutdown};

/// Outcome of scraping a single venue.
pub(crate) enum VenueOutcome {
    Ok { brands: usize, path: PathBuf },
    Err(anyhow::Error),
}

/// Report location for one venue, keyed by its slug.
pub(crate) fn venue_report_path(output_dir: &Path, venue: &VenueConfig) -> PathBuf {
    output_dir.join(format!("{}_brands.json", venue.slug()))
}

pub(crate) async fn run_batch(
    config: &AppConfig,
    venues_path: Option<&Path>,
) -> anyhow::Result<()> {
    let path = venues_path.unwrap_or(config.venues_path.as_path());
    let venues = load_venues(path)?.venues;
    if venues.is_empty() {
        println!("no venues configured in {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(&config.output_dir)?;

    let (session, scraper) = launch_scraper(config).await?;
    let max_concurrent = config.max_concurrent_venues.max(1);

    let results: Vec<(&VenueConfig, VenueOutcome)> = stream::iter(&venues)
        .map(|venue| {
            let fut = scrape_venue(&scraper, &config.output_dir, venue);
            async move { (venue, fut.await) }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    shutdown(session, scraper).await;

    let mut failed_venues = 0usize;
    let mut total_brands = 0usize;
    for (venue, outcome) in &results {
        match outcome {
            VenueOutcome::Ok { brands, path } => {
                total_brands += brands;
                println!("{:<32} {brands:>5} brands  {}", venue.name, path.display());
            }
            VenueOutcome::Err(e) => {
                failed_venues += 1;
                tracing::error!(venue = %venue.name, error = %e, "venue scrape failed");
                println!("{:<32} FAILED: {e:#}", venue.name);
            }
        }
    }

    if failed_venues > 0 {
        tracing::warn!(
            failed_venues,
            total_venues = venues.len(),
            "batch completed with failures"
        );
    }
    println!(
        "{} of {} venues scraped, {total_brands} brands in total",
        venues.len() - failed_venues,
        venues.len()
    );

    if failed_venues == venues.len() {
        anyhow::bail!("every venue in the batch failed");
    }
    Ok(())
}

async fn scrape_venue(
    scraper: &DirectoryScraper,
    output_dir: &Path,
    venue: &VenueConfig,
) -> VenueOutcome {
    let scrape = match scraper.scrape(&venue.url).await {
        Ok(scrape) => scrape,
        Err(e) => return VenueOutcome::Err(e.into()),
    };
    if scrape.timed_out {
        tracing::warn!(venue = %venue.name, "extraction timed out; report is partial");
    }

    let path = venue_report_path(output_dir, venue);
    let report = BrandReport::new(&venue.url, scrape.brands);
    match report.write_to(&path) {
        Ok(()) => VenueOutcome::Ok {
            brands: report.total_brands,
            path,
        },
        Err(e) => VenueOutcome::Err(e.into()),
    }
}
