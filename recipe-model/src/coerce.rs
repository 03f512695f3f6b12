//! Central numeric/text coercion rules.
//!
//! Parsers hand over strings exactly as the source wrote them; everything
//! that needs a number goes through here so the store and the repair pass
//! agree on one rule: ranges collapse to their low end, times keep their
//! first integer, unknown text stays absent.

use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\d+").expect("invalid integer pattern")
});

/// First integer in the string wins: `"30-45 minutes"` → `30`,
/// `"about 20 mins"` → `20`. No digits → `None`.
pub fn first_integer(text: &str) -> Option<u32> {
    FIRST_INTEGER.find(text)?.as_str().parse().ok()
}

/// Collapse an amount string to a number, taking the low end of a range:
/// `"2-4"` → `2.0`, `"1/2"` → `0.5`, `"1 ½"` → `1.5`, `"1.5"` → `1.5`.
pub fn low_end(text: &str) -> Option<f64> {
    let head = text
        .trim()
        .split(['-', '–'])
        .next()
        .unwrap_or_default()
        .trim();
    parse_quantity(head)
}

/// Parse a plain quantity token sequence: decimal, slash fraction, unicode
/// vulgar fraction, or a mixed number combining a whole part with either.
fn parse_quantity(text: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut seen = false;
    for token in text.split_whitespace().take(2) {
        match token_value(token) {
            Some(v) => {
                total += v;
                seen = true;
            }
            None => break,
        }
    }
    seen.then_some(total)
}

fn token_value(token: &str) -> Option<f64> {
    if let Some((n, d)) = token.split_once('/') {
        let n: f64 = n.trim().parse().ok()?;
        let d: f64 = d.trim().parse().ok()?;
        return (d != 0.0).then(|| n / d);
    }
    // Mixed single token like "1½"
    if let Some(last) = token.chars().last() {
        if let Some(frac) = vulgar_fraction(last) {
            let whole = &token[..token.len() - last.len_utf8()];
            if whole.is_empty() {
                return Some(frac);
            }
            return whole.parse::<f64>().ok().map(|w| w + frac);
        }
    }
    token.parse().ok()
}

/// Unicode vulgar fractions as numeric values.
pub fn vulgar_fraction(c: char) -> Option<f64> {
    let (n, d): (f64, f64) = match c {
        '¼' => (1.0, 4.0),
        '½' => (1.0, 2.0),
        '¾' => (3.0, 4.0),
        '⅓' => (1.0, 3.0),
        '⅔' => (2.0, 3.0),
        '⅕' => (1.0, 5.0),
        '⅖' => (2.0, 5.0),
        '⅗' => (3.0, 5.0),
        '⅘' => (4.0, 5.0),
        '⅙' => (1.0, 6.0),
        '⅚' => (5.0, 6.0),
        '⅛' => (1.0, 8.0),
        '⅜' => (3.0, 8.0),
        '⅝' => (5.0, 8.0),
        '⅞' => (7.0, 8.0),
        _ => return None,
    };
    Some(n / d)
}

static MARKUP_ARTIFACTS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)\*\*|__|`|&#x200b;|\[x200b\]|\u{200b}|\[video\]").expect("invalid markup pattern")
});

/// Strip leaked markdown/markup artifacts and collapse whitespace.
/// `"**Tomato** &amp; basil"` → `"Tomato & basil"`.
pub fn strip_markdown(text: &str) -> String {
    let cleaned = MARKUP_ARTIFACTS.replace_all(text, "");
    let cleaned = cleaned.replace("&amp;", "&").replace("&nbsp;", " ");
    let cleaned = cleaned.trim_start_matches('#');
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::range("30-45 minutes", Some(30))]
    #[case::plain("15 min", Some(15))]
    #[case::prefixed("about 20 mins", Some(20))]
    #[case::none("a while", None)]
    fn first_integer_cases(#[case] input: &str, #[case] expected: Option<u32>) {
        assert_eq!(first_integer(input), expected);
    }

    #[rstest]
    #[case::range("2-4", Some(2.0))]
    #[case::en_dash_range("2–4", Some(2.0))]
    #[case::fraction("1/2", Some(0.5))]
    #[case::vulgar("½", Some(0.5))]
    #[case::mixed("1 1/2", Some(1.5))]
    #[case::mixed_vulgar("1 ½", Some(1.5))]
    #[case::glued_vulgar("1½", Some(1.5))]
    #[case::decimal("1.5", Some(1.5))]
    #[case::whole("24", Some(24.0))]
    #[case::junk("to taste", None)]
    fn low_end_cases(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(low_end(input), expected);
    }

    #[rstest]
    #[case::bold("**Tomato** &amp; basil", "Tomato & basil")]
    #[case::heading("## Pasta", "Pasta")]
    #[case::zero_width("salt[x200b] pepper", "salt pepper")]
    #[case::video("watch [video] here", "watch here")]
    #[case::plain("plain text", "plain text")]
    fn strip_markdown_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_markdown(input), expected);
    }
}
