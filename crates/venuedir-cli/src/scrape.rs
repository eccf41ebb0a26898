//! Single-venue `scrape` command and the browser setup shared with `batch`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use venuedir_core::{default_report_filename, AppConfig, BrandReport};
use venuedir_scraper::{
    AcceptAllConsent, BrowserOptions, ChromiumSession, DirectoryScraper, PageProvider,
    ScrapeOptions,
};

pub(crate) fn browser_options(config: &AppConfig) -> BrowserOptions {
    BrowserOptions {
        headless: config.headless,
        chromium_path: config.chromium_path.clone(),
        navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
    }
}

/// Launch Chromium and wire a scraper to it.
///
/// The session is returned alongside so the caller can close the browser once
/// the scraper is dropped.
pub(crate) async fn launch_scraper(
    config: &AppConfig,
) -> anyhow::Result<(Arc<ChromiumSession>, DirectoryScraper)> {
    let session = Arc::new(ChromiumSession::launch(&browser_options(config)).await?);
    let provider: Arc<dyn PageProvider> = session.clone();
    let scraper = DirectoryScraper::new(
        provider,
        Some(Arc::new(AcceptAllConsent::new(config.page_settle_ms))),
        ScrapeOptions::from(config),
    );
    Ok((session, scraper))
}

pub(crate) async fn shutdown(session: Arc<ChromiumSession>, scraper: DirectoryScraper) {
    drop(scraper);
    match Arc::try_unwrap(session) {
        Ok(session) => session.close().await,
        Err(_) => tracing::debug!("browser session still shared; leaving it to drop"),
    }
}

/// `-o` wins; otherwise the URL-derived name inside the output directory.
pub(crate) fn report_path(output_dir: &Path, url: &str, output: Option<&Path>) -> PathBuf {
    output.map_or_else(
        || output_dir.join(default_report_filename(url)),
        Path::to_path_buf,
    )
}

pub(crate) fn print_report(report: &BrandReport, path: &Path) {
    println!("{} brands found at {}", report.total_brands, report.url);
    for brand in &report.brands {
        println!("  - {brand}");
    }
    println!("report written to {}", path.display());
}

pub(crate) async fn run_scrape(
    config: &AppConfig,
    url: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let path = report_path(&config.output_dir, url, output);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let (session, scraper) = launch_scraper(config).await?;
    let brands = scraper.scrape_brands(url).await;
    shutdown(session, scraper).await;

    if brands.is_empty() {
        tracing::warn!(url, "no brands extracted");
    }

    let report = BrandReport::new(url, brands);
    report.write_to(&path)?;
    print_report(&report, &path);
    Ok(())
}
