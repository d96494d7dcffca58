//! Mail intake: raw messages in, `EmailInput` out.
//!
//! Pure string helpers live here; MIME parsing lives in [`eml`].

pub mod eml;

pub use eml::{RawEmail, parse_message};

/// Check if a sender address is in the allowlist.
///
/// Entries: `*`, an exact address, `@domain`, or a bare `domain`.
pub fn is_sender_allowed(allowed: &[String], sender: &str) -> bool {
    if allowed.is_empty() {
        return false;
    }
    if allowed.iter().any(|a| a == "*") {
        return true;
    }
    let sender_lower = sender.trim().to_lowercase();
    allowed.iter().any(|a| {
        let a = a.trim().to_lowercase();
        if a.starts_with('@') {
            sender_lower.ends_with(&a)
        } else if a.contains('@') {
            a == sender_lower
        } else {
            sender_lower.ends_with(&format!("@{a}"))
        }
    })
}

/// Strip HTML tags and collapse whitespace.
///
/// Block-level closers become line breaks so sentences stay apart.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "br" | "p" | "div" | "li" | "tr" | "h1" | "h2" | "h3") {
                    text.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => text.push(ch),
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip quoted reply text from a body.
///
/// Drops `>` lines, and everything after an "On ... wrote:" attribution or
/// an "Original Message" separator.
pub fn strip_quoted_text(body: &str) -> String {
    let mut kept = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('>') {
            continue;
        }
        if trimmed.starts_with("On ") && trimmed.ends_with("wrote:") {
            break;
        }
        if trimmed.starts_with("---") && trimmed.contains("Original Message") {
            break;
        }
        kept.push(line);
    }

    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }

    kept.join("\n")
}
