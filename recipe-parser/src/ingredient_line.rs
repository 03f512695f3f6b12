//! Single ingredient line parsing.
//!
//! `parse_ingredient_smart` splits a line into `(item, amount, unit, notes)`
//! without ever failing: anything it cannot account for stays in the item.
//! The amount keeps the exact source text (`"2-4"`, `"1 ½"`); only the unit
//! is matched against the parser's known-unit set, longest form first, so
//! `"1 fl oz"` binds the two-token unit and `"1 Eggplant cut into cubes"`
//! leaves the capitalized token as the ingredient name.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::fraction::quantity_span;

/// A structurally parsed ingredient line.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ParsedIngredientLine {
    pub item: String,
    pub amount: String,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

/// Preparation phrases that belong in `notes`, not in the item.
static PREPARATION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"(?i)\b(cut into [a-z ]+|finely chopped|roughly chopped|thinly sliced|chopped|diced|minced|sliced|peeled|grated|crushed|cubed|halved|quartered|torn|softened|melted|at room temperature|beaten|rinsed|drained|divided)\b",
    )
    .expect("invalid preparation pattern")
});

pub(crate) fn strip_bullet(line: &str) -> &str {
    line.trim_start()
        .trim_start_matches(['-', '*', '•', '・', '–'])
        .trim_start()
}

/// Parse one ingredient line against a known-unit set.
///
/// The unit set is matched case-insensitively against the text following
/// the quantity; multi-word units ("fl oz") are tried before shorter ones.
/// A token that is not a known unit is part of the item, capitalized or not.
pub fn parse_ingredient_smart(line: &str, units: &[String]) -> ParsedIngredientLine {
    let line = strip_bullet(line);

    let (amount, rest) = match quantity_span(line) {
        Ok((rest, span)) => (span.to_string(), rest.trim_start()),
        Err(_) => (String::new(), line),
    };

    let (unit, rest) = if amount.is_empty() {
        (None, rest)
    } else {
        match_unit(rest, units)
    };

    let (head, comma_notes) = match rest.split_once(',') {
        Some((head, tail)) => (head.trim(), Some(tail.trim().to_string())),
        None => (rest.trim(), None),
    };

    let (item, prep_notes) = split_preparation(head);

    let notes = match (prep_notes, comma_notes) {
        (Some(p), Some(c)) => Some(format!("{p}, {c}")),
        (Some(p), None) => Some(p),
        (None, c) => c,
    };

    ParsedIngredientLine {
        item,
        amount,
        unit,
        notes: notes.filter(|n| !n.is_empty()),
    }
}

/// Longest-first unit match at the start of `rest`. Returns the unit as
/// written plus the remaining text.
fn match_unit<'a>(rest: &'a str, units: &[String]) -> (Option<String>, &'a str) {
    let mut candidates: Vec<&String> = units.iter().collect();
    candidates.sort_by_key(|u| std::cmp::Reverse(u.len()));
    for unit in candidates {
        if let Some(after) = strip_prefix_ignore_case(rest, unit) {
            // Unit must end at a word boundary: "l" must not eat "leeks".
            if after.chars().next().is_none_or(|c| !c.is_alphanumeric()) {
                let written = rest[..rest.len() - after.len()].to_string();
                let remaining = after.trim_start_matches(['.', ' ']);
                return (Some(written), remaining);
            }
        }
    }
    (None, rest)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = text.chars();
    for expected in prefix.chars() {
        let found = rest.next()?;
        if !found.eq_ignore_ascii_case(&expected) {
            return None;
        }
    }
    Some(rest.as_str())
}

/// Split a trailing preparation phrase off the item:
/// `"Eggplant cut into cubes"` → (`"Eggplant"`, `Some("cut into cubes")`).
fn split_preparation(head: &str) -> (String, Option<String>) {
    if let Some(m) = PREPARATION.find(head) {
        let item = head[..m.start()].trim();
        let notes = head[m.start()..].trim();
        if !item.is_empty() {
            return (item.to_string(), Some(notes.to_string()));
        }
        // Leading preparation ("chopped walnuts") stays descriptive; the
        // whole head is the item.
    }
    (head.to_string(), None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::RecipeTextParser;
    use rstest::rstest;

    fn parse(line: &str) -> ParsedIngredientLine {
        let parser = RecipeTextParser::new();
        parser.parse_ingredient_smart(line)
    }

    #[rstest]
    #[case::plain("2 cups all-purpose flour", "all-purpose flour", "2", Some("cups"), None)]
    #[case::fraction("1/2 cup beef stock", "beef stock", "1/2", Some("cup"), None)]
    #[case::glued("4oz pancetta", "pancetta", "4", Some("oz"), None)]
    #[case::two_token_unit("3 fl oz cream", "cream", "3", Some("fl oz"), None)]
    #[case::capitalized_not_unit(
        "1 Eggplant cut into cubes",
        "Eggplant",
        "1",
        None,
        Some("cut into cubes")
    )]
    #[case::range("2-4 cloves garlic", "garlic", "2-4", Some("cloves"), None)]
    #[case::comma_notes("2 cups flour, sifted", "flour", "2", Some("cups"), Some("sifted"))]
    #[case::no_amount("salt", "salt", "", None, None)]
    #[case::vulgar("½ tsp vanilla extract", "vanilla extract", "½", Some("tsp"), None)]
    #[case::count_unit("2 eggs", "eggs", "2", None, None)]
    #[case::bulleted("- 1 pinch saffron", "saffron", "1", Some("pinch"), None)]
    #[case::dot_unit("2 tbsp. butter", "butter", "2", Some("tbsp"), None)]
    fn smart_parse_cases(
        #[case] line: &str,
        #[case] item: &str,
        #[case] amount: &str,
        #[case] unit: Option<&str>,
        #[case] notes: Option<&str>,
    ) {
        let parsed = parse(line);
        assert_eq!(parsed.item, item, "item for {line:?}");
        assert_eq!(parsed.amount, amount, "amount for {line:?}");
        assert_eq!(parsed.unit.as_deref(), unit, "unit for {line:?}");
        assert_eq!(parsed.notes.as_deref(), notes, "notes for {line:?}");
    }

    #[test]
    fn unit_does_not_eat_ingredient_prefix() {
        // "l" is a unit but "leeks" is not "l" + "eeks".
        let parsed = parse("2 leeks");
        assert_eq!(parsed.item, "leeks");
        assert_eq!(parsed.unit, None);
    }

    #[test]
    fn preparation_and_comma_notes_combine() {
        let parsed = parse("1 Eggplant cut into cubes, salted");
        assert_eq!(parsed.item, "Eggplant");
        assert_eq!(parsed.notes.as_deref(), Some("cut into cubes, salted"));
    }
}
