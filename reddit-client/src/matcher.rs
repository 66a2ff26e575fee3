//! Second-pass relevance filter. The upstream search is keyword-based and
//! noisy; this removes results whose match came from unrelated substrings.

/// Phrases that tend to surface unmet product needs.
pub const SEARCH_PATTERNS: [&str; 15] = [
    "is there a tool",
    "i wish there was an app",
    "i wish there an app",
    "how do you guys manage",
    "is there a better way to",
    "looking for a tool",
    "need an app for",
    "wish someone would build",
    "there should be an app",
    "anyone know of a tool",
    "how do you handle",
    "what tools do you use",
    "struggling with",
    "pain point",
    "frustrating that there's no",
];

/// The literal phrase plus a couple of lexical rewrites of common templates.
pub fn pattern_variants(pattern: &str) -> Vec<String> {
    let lower = pattern.to_lowercase();
    vec![
        lower.clone(),
        lower.replace("is there", "is there any"),
        lower.replace("i wish", "i really wish"),
    ]
}

/// True when any variant occurs in the case-folded title+body text. No
/// partial-credit scoring: a miss discards the item.
pub fn is_relevant(title: &str, body: &str, pattern: &str) -> bool {
    let text = format!("{} {}", title, body).to_lowercase();
    pattern_variants(pattern)
        .iter()
        .any(|variant| text.contains(variant.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_is_case_insensitive() {
        assert!(is_relevant(
            "Is There A Tool for X",
            "",
            "is there a tool"
        ));
    }

    #[test]
    fn rejects_text_without_any_variant() {
        assert!(!is_relevant(
            "I love my workflow",
            "everything is great",
            "struggling with"
        ));
    }

    #[test]
    fn body_text_counts_toward_the_match() {
        assert!(is_relevant(
            "Weekly vent thread",
            "honestly struggling with invoice tracking",
            "struggling with"
        ));
    }

    #[test]
    fn wish_variant_matches_emphasized_phrasing() {
        assert!(is_relevant(
            "I really wish there was an app for this",
            "",
            "i wish there was an app"
        ));
    }

    #[test]
    fn variants_include_the_literal_phrase_first() {
        let variants = pattern_variants("Is There A Tool");
        assert_eq!(variants[0], "is there a tool");
        assert!(variants.contains(&"is there any a tool".to_string()));
    }
}
