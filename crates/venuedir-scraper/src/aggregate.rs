//! Merge DOM and payload evidence into the final brand list.

use std::collections::{BTreeSet, HashMap};

use crate::cards::RATING_RE;
use crate::types::DirectoryCard;

/// Call-to-action and panel labels that are never brand names. Compared
/// against the trimmed, lowercased name.
pub const CTA_EXCLUSIONS: &[&str] = &[
    "order online",
    "reserve a table",
    "book online",
    "call",
    "directions",
    "view all",
    "directory",
    "save",
    "share",
    "nearby",
    "website",
    "menu",
    "send to phone",
];

/// Merge cards by `(name, category, floor)`, keeping the first card seen for
/// each key. DOM cards are considered before payload cards.
#[must_use]
pub fn aggregate_cards(dom_cards: &[DirectoryCard], payload_cards: &[DirectoryCard]) -> Vec<DirectoryCard> {
    let mut index: HashMap<(String, Option<String>, Option<String>), usize> = HashMap::new();
    let mut merged: Vec<DirectoryCard> = Vec::new();

    for card in dom_cards.iter().chain(payload_cards) {
        index.entry(card.entity_key()).or_insert_with(|| {
            merged.push(card.clone());
            merged.len() - 1
        });
    }

    tracing::debug!(
        dom = dom_cards.len(),
        payload = payload_cards.len(),
        merged = merged.len(),
        "cards aggregated"
    );
    merged
}

/// Sorted, de-duplicated brand names from both sources.
#[must_use]
pub fn aggregate(dom_cards: &[DirectoryCard], payload_cards: &[DirectoryCard]) -> Vec<String> {
    brand_names(&aggregate_cards(dom_cards, payload_cards))
}

/// Sorted, de-duplicated names of `cards`, minus anything that is not a brand.
#[must_use]
pub fn brand_names(cards: &[DirectoryCard]) -> Vec<String> {
    let names: BTreeSet<String> = cards
        .iter()
        .map(|card| card.name.trim())
        .filter(|name| is_brand_name(name))
        .map(str::to_string)
        .collect();
    names.into_iter().collect()
}

/// Whether `name` can be a brand: not empty, not a call to action, not a
/// bare number, not a rating.
#[must_use]
pub fn is_brand_name(name: &str) -> bool {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() || CTA_EXCLUSIONS.contains(&normalized.as_str()) {
        return false;
    }
    if normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ','))
    {
        return false;
    }
    !RATING_RE.is_match(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, category: Option<&str>, floor: Option<&str>) -> DirectoryCard {
        DirectoryCard {
            name: name.to_string(),
            link: None,
            category: category.map(str::to_string),
            floor: floor.map(str::to_string),
        }
    }

    #[test]
    fn merges_and_sorts_names() {
        let dom = vec![card("Zara", None, None), card("Apple", Some("Electronics"), None)];
        let payload = vec![card("Boots", None, Some("Level 1")), card("Zara", None, None)];
        assert_eq!(aggregate(&dom, &payload), vec!["Apple", "Boots", "Zara"]);
    }

    #[test]
    fn excludes_call_to_action_text_from_either_source() {
        let dom = vec![card("Directions", None, None), card("Lush", None, None)];
        let payload = vec![card(" CALL ", None, None), card("Order Online", None, None)];
        assert_eq!(aggregate(&dom, &payload), vec!["Lush"]);
    }

    #[test]
    fn first_card_for_a_key_wins() {
        let mut dom_card = card("Zara", Some("Clothing"), None);
        dom_card.link = Some("/maps/place/Zara".to_string());
        let mut payload_card = card("Zara", Some("Clothing"), None);
        payload_card.link = Some("0x1:0x2".to_string());

        let merged = aggregate_cards(&[dom_card], &[payload_card]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].link.as_deref(), Some("/maps/place/Zara"));
    }

    #[test]
    fn differing_detail_keeps_both_cards_but_one_name() {
        let dom = vec![card("Zara", Some("Clothing"), None)];
        let payload = vec![card("Zara", Some("Clothing"), Some("Level 2"))];
        assert_eq!(aggregate_cards(&dom, &payload).len(), 2);
        assert_eq!(aggregate(&dom, &payload), vec!["Zara"]);
    }

    #[test]
    fn key_is_case_sensitive() {
        let dom = vec![card("ZARA", None, None), card("Zara", None, None)];
        assert_eq!(aggregate(&dom, &[]), vec!["ZARA", "Zara"]);
    }

    #[test]
    fn numbers_and_ratings_are_not_brands() {
        assert!(!is_brand_name("4.5"));
        assert!(!is_brand_name("1,204"));
        assert!(!is_brand_name("4.5 stars"));
        assert!(!is_brand_name("   "));
        assert!(is_brand_name("7-Eleven"));
        assert!(is_brand_name("Five Guys"));
    }

    #[test]
    fn rating_labels_are_not_brands() {
        assert!(!is_brand_name("4 Stars"));
        assert!(!is_brand_name("Rated 4.5 out of 5 stars"));
        assert!(!is_brand_name("1,204 reviews"));
        assert!(!is_brand_name("(87)"));
    }

    #[test]
    fn names_containing_stars_are_brands() {
        assert!(is_brand_name("All Stars Sports"));
        assert!(is_brand_name("Superstars"));
        assert!(is_brand_name("5 Star Burgers"));

        let dom = vec![card("All Stars Sports", Some("Sporting goods store"), None)];
        assert_eq!(aggregate(&dom, &[]), vec!["All Stars Sports"]);
    }

    #[test]
    fn empty_inputs_give_empty_list() {
        assert!(aggregate(&[], &[]).is_empty());
    }
}
