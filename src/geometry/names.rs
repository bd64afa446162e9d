//! Person-name normalisation and matching.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip Unicode combining marks (NFD → drop `Mn` → NFC), lowercase,
/// replace `-` with space.
#[must_use]
pub fn normalize_person_name(name: &str) -> String {
    let stripped: String = name.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect();
    stripped.to_lowercase().replace('-', " ")
}

/// Exact match post-normalisation, or "all space-separated parts of the
/// query occur as substrings of the marker name" as a fallback.
#[must_use]
pub fn name_matches(query: &str, marker_name: &str) -> bool {
    let q = normalize_person_name(query);
    let m = normalize_person_name(marker_name);
    if q == m {
        return true;
    }
    q.split_whitespace().all(|part| m.contains(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diacritics_normalise_and_match_s6() {
        assert!(name_matches("jan-novak", "Jan Novák"));
    }

    #[test]
    fn exact_match_after_normalisation() {
        assert_eq!(normalize_person_name("Jan Novák"), "jan novak");
        assert_eq!(normalize_person_name("jan-novak"), "jan novak");
    }

    #[test]
    fn substring_fallback() {
        assert!(name_matches("jan", "Jan Novák"));
        assert!(!name_matches("petr", "Jan Novák"));
    }

    #[test]
    fn empty_query_trivially_matches_any_name() {
        assert!(name_matches("", "Jan Novák"));
    }
}
