//! One-line email summaries.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum summary length in characters.
const SUMMARY_MAX_CHARS: usize = 120;

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(hi|hello|hey|dear|good (morning|afternoon|evening)|greetings)(\s+[a-z]+){0,3}\s*[,!:]\s*")
        .expect("valid greeting regex")
});

/// Summarize an email body as its first meaningful sentence.
pub fn summarize(body: &str) -> String {
    let text = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let text = GREETING.replace(&text, "");
    let text = text.trim();
    if text.is_empty() {
        return "(empty email body)".to_string();
    }

    let sentence = first_sentence(text);
    truncate(sentence, SUMMARY_MAX_CHARS)
}

/// Cut at the first sentence terminator followed by whitespace.
fn first_sentence(text: &str) -> &str {
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            return text[..i].trim_end();
        }
        prev = Some(c);
    }
    text
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max - 1).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_greeting_and_takes_first_sentence() {
        let body = "Hi, please process the attached invoice for our accounting system. We need the amount.";
        assert_eq!(
            summarize(body),
            "please process the attached invoice for our accounting system."
        );
    }

    #[test]
    fn greeting_with_name() {
        assert_eq!(
            summarize("Hello team,\nShipment ABC123 delayed"),
            "Shipment ABC123 delayed"
        );
    }

    #[test]
    fn greeting_word_without_punctuation_is_kept() {
        assert_eq!(
            summarize("Hey the truck is late"),
            "Hey the truck is late"
        );
    }

    #[test]
    fn empty_body() {
        assert_eq!(summarize("   \n "), "(empty email body)");
    }

    #[test]
    fn long_body_truncated() {
        let body = "x".repeat(500);
        let summary = summarize(&body);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn decimal_points_do_not_split() {
        assert_eq!(
            summarize("Rate quote: $1,500.00 for Chicago to LA - please confirm"),
            "Rate quote: $1,500.00 for Chicago to LA - please confirm"
        );
    }
}
