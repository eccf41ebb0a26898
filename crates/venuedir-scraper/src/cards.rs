//! Directory card extraction from rendered markup.
//!
//! Applies a fixed list of structural strategies in priority order and keeps
//! the matches of every strategy, because a single directory often mixes
//! several renderings (list items, bare place anchors, tracked tiles).
//! Pure: no browser or network access.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::DirectoryCard;

/// How a strategy's matched element maps to the card element.
#[derive(Debug, Clone, Copy)]
enum CardTarget {
    /// The matched element is the card.
    Node,
    /// The matched element's parent is the card.
    Parent,
    /// The nearest ancestor matching the selector is the card.
    Closest(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct CardStrategy {
    name: &'static str,
    css: &'static str,
    target: CardTarget,
}

const CARD_STRATEGIES: &[CardStrategy] = &[
    CardStrategy {
        name: "role-listitem",
        css: r#"[role="listitem"]"#,
        target: CardTarget::Node,
    },
    CardStrategy {
        name: "anchor-container",
        css: r#"a[href*="/maps/place/"]"#,
        target: CardTarget::Parent,
    },
    CardStrategy {
        name: "tracking-container",
        css: "div[jslog]",
        target: CardTarget::Node,
    },
    CardStrategy {
        name: "place-link-container",
        css: r#"a[href*="/maps/place/"], a[href^="/g/"], a[data-cid]"#,
        target: CardTarget::Closest("div[aria-label]"),
    },
    CardStrategy {
        name: "known-class",
        css: "div.Nv2PK, div.Ymd7jc, div.bfdHYd",
        target: CardTarget::Node,
    },
];

const PLACE_ANCHOR_CSS: &str = r#"a[href*="/maps/place/"], a[href^="/g/"], a[data-cid]"#;
const HEADING_CSS: &str =
    r#"[role="heading"], h1, h2, h3, h4, .fontHeadlineSmall, .fontTitleSmall, .qBF1Pd"#;

/// Sub-structures that carry a category label, most specific first.
const CATEGORY_CSS: &[&str] = &[
    "[data-category]",
    ".category",
    ".W4Efsd > span:first-child",
    ".fontBodySmall > span:first-child",
    ".fontBodyMedium > span:first-child",
];

/// Sub-structures that may carry a level/floor label.
const FLOOR_CSS: &[&str] = &[
    "[data-floor]",
    ".floor",
    ".W4Efsd span",
    ".fontBodySmall span",
    ".fontBodyMedium span",
];

const SEGMENT_SEPARATORS: &[char] = &['·', '⋅', '•', '|'];

/// [`CardTarget`] with its ancestor selector compiled.
enum ResolvedTarget {
    Node,
    Parent,
    Closest(Selector),
}

static STRATEGY_SELECTORS: LazyLock<Vec<(&'static str, Selector, ResolvedTarget)>> =
    LazyLock::new(|| {
        CARD_STRATEGIES
            .iter()
            .map(|s| {
                let target = match s.target {
                    CardTarget::Node => ResolvedTarget::Node,
                    CardTarget::Parent => ResolvedTarget::Parent,
                    CardTarget::Closest(css) => ResolvedTarget::Closest(compile(css)),
                };
                (s.name, compile(s.css), target)
            })
            .collect()
    });
static PLACE_ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile(PLACE_ANCHOR_CSS));
static HEADING: LazyLock<Selector> = LazyLock::new(|| compile(HEADING_CSS));
static CATEGORY: LazyLock<Vec<Selector>> =
    LazyLock::new(|| CATEGORY_CSS.iter().map(|css| compile(css)).collect());
static FLOOR: LazyLock<Vec<Selector>> =
    LazyLock::new(|| FLOOR_CSS.iter().map(|css| compile(css)).collect());
/// Whole-string ratings and counts: `4.3`, `(1,204)`, `4.5 stars`,
/// `Rated 4.5 out of 5 stars`, `1,204 reviews`. Names that merely contain
/// the word "stars" do not match.
pub(crate) static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\(\d[\d,.]*\)|(?:rated\s+)?\d[\d,.]*(?:\s*(?:out\s+of\s+\d+\s*)?(?:stars?|reviews?|ratings?))?)\.?$",
    )
    .expect("valid regex")
});

fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Where a card's name was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameSource {
    Anchor,
    Heading,
}

/// A parsed card together with the origin of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedCard {
    pub card: DirectoryCard,
    pub source: NameSource,
}

/// Extract directory cards from a markup fragment or document.
///
/// Strategies run in priority order and an element yielding the same
/// `(name, link, source)` as an earlier match is skipped. The surviving cards
/// come out in document order.
#[must_use]
pub fn parse_cards(markup: &str) -> Vec<DirectoryCard> {
    parse_sourced_cards(markup)
        .into_iter()
        .map(|sourced| sourced.card)
        .collect()
}

/// Like [`parse_cards`] but keeps the name origin of each card.
#[must_use]
pub fn parse_sourced_cards(markup: &str) -> Vec<SourcedCard> {
    let document = Html::parse_document(markup);
    let positions: HashMap<_, usize> = document
        .tree
        .root()
        .descendants()
        .enumerate()
        .map(|(position, node)| (node.id(), position))
        .collect();
    let mut visited_nodes = HashSet::new();
    let mut seen_keys: HashSet<(String, Option<String>, NameSource)> = HashSet::new();
    let mut cards: Vec<(usize, SourcedCard)> = Vec::new();

    for (name, selector, target) in STRATEGY_SELECTORS.iter() {
        let mut matched = 0usize;
        for element in document.select(selector) {
            let Some(card_el) = resolve_target(element, target) else {
                continue;
            };
            if !visited_nodes.insert(card_el.id()) {
                continue;
            }
            let Some(sourced) = card_from_element(card_el) else {
                continue;
            };
            let key = (
                sourced.card.name.clone(),
                sourced.card.link.clone(),
                sourced.source,
            );
            if !seen_keys.insert(key) {
                continue;
            }
            matched += 1;
            let position = positions.get(&card_el.id()).copied().unwrap_or(usize::MAX);
            cards.push((position, sourced));
        }
        if matched > 0 {
            tracing::trace!(strategy = *name, matched, "card strategy matched");
        }
    }

    cards.sort_by_key(|(position, _)| *position);
    cards.into_iter().map(|(_, sourced)| sourced).collect()
}

fn resolve_target<'a>(element: ElementRef<'a>, target: &ResolvedTarget) -> Option<ElementRef<'a>> {
    match target {
        ResolvedTarget::Node => Some(element),
        ResolvedTarget::Parent => element.parent().and_then(ElementRef::wrap),
        ResolvedTarget::Closest(selector) => element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| selector.matches(ancestor)),
    }
}

fn card_from_element(element: ElementRef<'_>) -> Option<SourcedCard> {
    if is_aggregate(element) {
        return None;
    }

    let anchor = element.select(&PLACE_ANCHOR).next();
    let link = anchor
        .and_then(|a| a.value().attr("href").or_else(|| a.value().attr("data-cid")))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string);

    let anchor_name = anchor.and_then(|a| {
        a.value()
            .attr("aria-label")
            .map(collapse_whitespace)
            .filter(|label| !label.is_empty())
            .or_else(|| Some(element_text(a)).filter(|text| !text.is_empty()))
    });

    let (name, source) = match anchor_name {
        Some(name) => (name, NameSource::Anchor),
        None => {
            let heading = element.select(&HEADING).next()?;
            (element_text(heading), NameSource::Heading)
        }
    };

    let mut card = DirectoryCard::named(&name)?;
    card.link = link;
    card.category = extract_category(element, &card.name);
    card.floor = extract_floor(element);

    Some(SourcedCard { card, source })
}

/// An element holding several distinct place links or several headings is a
/// list wrapper, not a single card.
fn is_aggregate(element: ElementRef<'_>) -> bool {
    let hrefs: HashSet<&str> = element
        .select(&PLACE_ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .collect();
    if hrefs.len() > 1 {
        return true;
    }
    element.select(&HEADING).nth(1).is_some()
}

fn extract_category(element: ElementRef<'_>, name: &str) -> Option<String> {
    for selector in CATEGORY.iter() {
        for node in element.select(selector) {
            if let Some(value) = node.value().attr("data-category") {
                let value = collapse_whitespace(value);
                if !value.is_empty() {
                    return Some(value);
                }
            }
            let found = segments(&element_text(node)).into_iter().find(|segment| {
                segment != name && !looks_like_floor(segment) && !is_noise_segment(segment)
            });
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

fn extract_floor(element: ElementRef<'_>) -> Option<String> {
    for selector in FLOOR.iter() {
        for node in element.select(selector) {
            if let Some(value) = node.value().attr("data-floor") {
                let value = collapse_whitespace(value);
                if !value.is_empty() {
                    return Some(value);
                }
            }
            let found = segments(&element_text(node))
                .into_iter()
                .find(|segment| looks_like_floor(segment));
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

/// Level/floor heuristic for rendered labels: `Level 2`, `Floor 1`,
/// `Ground floor`, `Upper level`.
fn looks_like_floor(segment: &str) -> bool {
    let lower = segment.trim().to_lowercase();
    lower.starts_with("level")
        || lower.starts_with("floor")
        || lower.ends_with(" floor")
        || lower.ends_with(" level")
}

/// Ratings, review counts, and opening-hours fragments.
fn is_noise_segment(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    RATING_RE.is_match(segment)
        || lower.starts_with("open")
        || lower.starts_with("closed")
        || lower.starts_with("closes")
        || segment.chars().all(|c| !c.is_alphanumeric())
}

fn segments(text: &str) -> Vec<String> {
    text.split(SEGMENT_SEPARATORS)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "cards_test.rs"]
mod tests;
