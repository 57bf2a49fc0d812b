//! Small text helpers shared by the dispatcher and the flow inferencer.

use std::sync::LazyLock;

use regex::Regex;

static AFFIRMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(yes|yep|yeah|yup|ok(ay)?|confirm(ed)?|sure|go ahead|do it|delete it|let'?s do it|sounds good)\b")
        .expect("affirmative regex is valid")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no|nope|cancel|stop|don'?t|never ?mind|keep it)\b")
        .expect("negative regex is valid")
});

static IFRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<iframe\b.*?</iframe>").expect("iframe regex is valid"));

static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("script regex is valid"));

static EMBED_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*class\s*=\s*["'][^"']*embed[^"']*["'][^>]*>.*</div>"#)
        .expect("embed div regex is valid")
});

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[A-Za-z][A-Za-z0-9-]*(\s[^<>]*)?/?>").expect("html tag regex is valid")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("quoted regex is valid"));

/// A yes-like reply that is not also a refusal.
pub fn is_affirmative(message: &str) -> bool {
    AFFIRMATIVE.is_match(message) && !NEGATIVE.is_match(message)
}

/// Whether the message carries any HTML tag.
pub fn looks_like_markup(message: &str) -> bool {
    HTML_TAG.is_match(message)
}

/// Embed markup in a pasted message.
///
/// Prefers an `<iframe>` block, then a `<script>` block, then a div whose
/// class mentions "embed", and otherwise takes the trimmed message whole.
pub fn extract_embed_markup(message: &str) -> String {
    [&*IFRAME, &*SCRIPT, &*EMBED_DIV]
        .iter()
        .find_map(|re| re.find(message))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| message.trim().to_string())
}

/// The first double-quoted span, used to recover page titles from prompts.
pub fn first_quoted(text: &str) -> Option<String> {
    QUOTED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
