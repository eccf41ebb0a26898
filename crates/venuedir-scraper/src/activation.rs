//! Best-effort UI preparation: open the directory tab and expand the list.
//!
//! Every cascade is a list of [`Locator`]s tried in order by one driver. A
//! candidate that is missing, disabled, hidden, or fails to click just
//! advances the cascade.

use crate::page::{DirectoryPage, Locator};

pub const VIEW_ALL_LABEL: &str = "View all";

/// Section headings a "View all" control may sit under.
pub const SECTION_HEADINGS: &[&str] = &["Directory", "About"];

/// Tab strategies for the venue's directory tab.
#[must_use]
pub fn directory_tab_locators() -> Vec<Locator> {
    vec![
        Locator::role("tab", "Directory"),
        Locator::css(r#"button[role="tab"][aria-label*="Directory"]"#),
        Locator::text("button", "Directory", true),
        Locator::xpath(r#"//div[@role="tablist"]//*[normalize-space(.)="Directory"]"#),
    ]
}

/// Direct strategies for the "View all" control.
#[must_use]
pub fn view_all_locators() -> Vec<Locator> {
    let span = r#"//span[contains(text(), "View all")]"#;
    vec![
        Locator::role("button", VIEW_ALL_LABEL),
        Locator::css(r#"[aria-label="View all"]"#),
        Locator::css(r#"[jslog*="103597"]"#),
        Locator::xpath(format!("{span}/ancestor::button[1]")),
        Locator::xpath(format!(r#"{span}/ancestor::div[@role="button"][1]"#)),
        Locator::xpath(format!("{span}/ancestor::a[1]")),
    ]
}

/// Heading-relative strategies used once the direct cascade is exhausted.
#[must_use]
pub fn structural_view_all_locators(headings: &[&str]) -> Vec<Locator> {
    let mut locators = Vec::new();
    for heading in headings {
        let h2 = Locator::text("h2", *heading, false);
        let button = Locator::text("button", VIEW_ALL_LABEL, true);
        locators.push(Locator::xpath(format!(
            r#"//h2[contains(normalize-space(.), "{heading}")]/following::button[normalize-space(.)="View all"][1]"#
        )));
        locators.push(Locator::within(
            Locator::within(
                h2.clone(),
                Locator::xpath("ancestor::div[contains(@class,'m6QErb')][1]"),
            ),
            button.clone(),
        ));
        locators.push(Locator::within(
            Locator::within(h2, Locator::xpath("parent::div")),
            button,
        ));
    }
    locators
}

/// Cascade driver: click the first candidate that exists, is enabled, and is
/// visible after scrolling it into view. Returns the index of the clicked
/// candidate.
pub async fn click_first_available(
    page: &dyn DirectoryPage,
    candidates: &[Locator],
    settle_ms: u64,
) -> Option<usize> {
    for (index, candidate) in candidates.iter().enumerate() {
        match page.count(candidate).await {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(locator = %candidate, error = %e, "candidate lookup failed");
                continue;
            }
        }
        match page.is_enabled(candidate).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(locator = %candidate, "candidate disabled");
                continue;
            }
            Err(e) => {
                tracing::debug!(locator = %candidate, error = %e, "enabled check failed");
                continue;
            }
        }
        if let Err(e) = page.scroll_into_view(candidate).await {
            tracing::debug!(locator = %candidate, error = %e, "scroll into view failed");
        }
        match page.is_visible(candidate).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(locator = %candidate, "candidate hidden");
                continue;
            }
            Err(e) => {
                tracing::debug!(locator = %candidate, error = %e, "visibility check failed");
                continue;
            }
        }
        if let Err(e) = page.click(candidate).await {
            tracing::debug!(locator = %candidate, error = %e, "click failed");
            continue;
        }
        page.wait(settle_ms).await;
        return Some(index);
    }
    None
}

/// Open the directory tab if the venue has one.
pub async fn activate_directory_tab(
    page: &dyn DirectoryPage,
    strategies: &[Locator],
    settle_ms: u64,
) -> bool {
    match click_first_available(page, strategies, settle_ms).await {
        Some(index) => {
            tracing::info!(strategy = index + 1, "directory tab activated");
            true
        }
        None => {
            tracing::debug!("no directory tab found");
            false
        }
    }
}

/// Expand the collapsed directory, trying `strategies` first and the
/// heading-relative fallback second.
pub async fn click_view_all(
    page: &dyn DirectoryPage,
    strategies: &[Locator],
    settle_ms: u64,
) -> bool {
    if let Some(index) = click_first_available(page, strategies, settle_ms).await {
        tracing::info!(strategy = index + 1, "clicked view all");
        return true;
    }

    let fallback = structural_view_all_locators(SECTION_HEADINGS);
    if let Some(index) = click_first_available(page, &fallback, settle_ms).await {
        tracing::info!(
            locator = %fallback[index],
            "clicked view all via section heading"
        );
        return true;
    }

    tracing::warn!("could not click view all; directory may already be expanded");
    false
}

#[cfg(test)]
#[path = "activation_test.rs"]
mod tests;
