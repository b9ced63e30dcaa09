// src/matching/location.rs
//
// Best-effort city/state extraction from a free-text address. This is a
// comma-split heuristic, not a validated postal parser; it can misfire on
// unusual punctuation and callers must tolerate empty results.

use once_cell::sync::Lazy;
use regex::Regex;

static STATE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2}\b").unwrap());

/// City and state tokens derived from an address. Either or both may be
/// empty when the heuristic finds nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressLocation {
    pub city: String,
    pub state: String,
}

impl AddressLocation {
    pub fn is_empty(&self) -> bool {
        self.city.is_empty() && self.state.is_empty()
    }
}

/// Split on commas and inspect the last and second-to-last segments for a
/// two-letter uppercase token (the state); the city is the second-to-last
/// segment with any state token stripped. Fewer than two segments, or no
/// address, yields empty results.
pub fn extract_city_state(address: Option<&str>) -> AddressLocation {
    let address = match address {
        Some(a) => a,
        None => return AddressLocation::default(),
    };
    let segments: Vec<&str> = address.split(',').map(str::trim).collect();
    if segments.len() < 2 {
        return AddressLocation::default();
    }
    let last = segments[segments.len() - 1];
    let second_last = segments[segments.len() - 2];

    let state = find_state_token(last)
        .or_else(|| find_state_token(second_last))
        .unwrap_or_default();

    let city = collapse_spaces(&STATE_TOKEN_RE.replace_all(second_last, ""));

    AddressLocation { city, state }
}

fn find_state_token(segment: &str) -> Option<String> {
    STATE_TOKEN_RE
        .find(segment)
        .map(|m| m.as_str().to_string())
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_address() {
        let loc = extract_city_state(Some("123 Main St, Miami, FL 33139"));
        assert_eq!(loc.city, "Miami");
        assert_eq!(loc.state, "FL");
    }

    #[test]
    fn test_state_in_last_segment_alone() {
        let loc = extract_city_state(Some("1 Elm Ave, Springfield, IL"));
        assert_eq!(loc.city, "Springfield");
        assert_eq!(loc.state, "IL");
    }

    #[test]
    fn test_state_embedded_in_city_segment() {
        let loc = extract_city_state(Some("450 Pine Rd, Tampa FL, 33601"));
        assert_eq!(loc.city, "Tampa");
        assert_eq!(loc.state, "FL");
    }

    #[test]
    fn test_two_segments() {
        let loc = extract_city_state(Some("Miami, FL"));
        assert_eq!(loc.city, "Miami");
        assert_eq!(loc.state, "FL");
    }

    #[test]
    fn test_too_few_segments() {
        assert!(extract_city_state(Some("123 Main St Miami FL")).is_empty());
        assert!(extract_city_state(Some("")).is_empty());
        assert!(extract_city_state(None).is_empty());
    }

    #[test]
    fn test_lowercase_state_is_not_a_token() {
        let loc = extract_city_state(Some("9 Oak St, Denver, co 80014"));
        assert_eq!(loc.state, "");
        assert_eq!(loc.city, "Denver");
    }

    #[test]
    fn test_multi_word_city() {
        let loc = extract_city_state(Some("77 Shore Blvd, West Palm Beach, FL 33401"));
        assert_eq!(loc.city, "West Palm Beach");
        assert_eq!(loc.state, "FL");
    }
}
