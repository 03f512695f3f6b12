//! The bad-ingredient filter.
//!
//! Reddit-ish recipe prose leaks instructions, section headers and
//! annotations into ingredient lists. Every candidate line passes through
//! [`reject_reason`]; a `Some` result names why the line is not an
//! ingredient, which batch logs surface per item.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// Why a candidate line was dropped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineRejection {
    CookingVerb,
    SectionHeader,
    Annotation,
    FullSentence,
    TooLong,
    LeakedMarkup,
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            LineRejection::CookingVerb => "starts with a cooking verb",
            LineRejection::SectionHeader => "is a section header",
            LineRejection::Annotation => "is a standalone annotation",
            LineRejection::FullSentence => "reads as a full sentence",
            LineRejection::TooLong => "exceeds the length limit",
            LineRejection::LeakedMarkup => "contains leaked markup",
        };
        f.write_str(reason)
    }
}

const MAX_INGREDIENT_LEN: usize = 200;

static COOKING_VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "preheat", "bake", "stir", "cook", "fill", "toss", "drain", "sift", "coat", "serve",
        "remove", "combine", "deglaze", "warm", "heat", "mix", "whisk", "fold", "pour", "simmer",
        "boil", "saute", "sauté", "fry", "roast", "grill", "blend", "knead", "spread", "transfer",
        "repeat", "let", "allow", "place", "put", "cover", "reduce", "season", "garnish", "chill",
        "refrigerate", "freeze", "melt", "beat", "cream", "dissolve", "sprinkle", "arrange",
    ]
    .into_iter()
    .collect()
});

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^(for (the )?[a-z ]+:?$|(the )?(filling|topping|sauce|dough|batter|glaze|crust)\s*:?$|preparation:?$|instructions?:?$|ingredients?:?$|method:?$|directions?:?$)")
        .expect("invalid section header pattern")
});

static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^\(?\s*(to taste|optional|as needed|serves\s+\d+[^)]*)\s*\)?\s*$")
        .expect("invalid annotation pattern")
});

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)\b(preheat|bake|stir|cook|add|mix|pour|whisk|fold|simmer|boil|serve|remove|combine|heat|place|cover|drain|toss)\b")
        .expect("invalid action verb pattern")
});

const MARKUP_TOKENS: [&str; 5] = ["**", "&amp;", "[video]", "[x200b]", "&#x200B;"];

/// Test one candidate line. `None` means the line is kept.
pub fn reject_reason(line: &str) -> Option<LineRejection> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(LineRejection::Annotation);
    }
    if trimmed.len() > MAX_INGREDIENT_LEN {
        return Some(LineRejection::TooLong);
    }
    if MARKUP_TOKENS
        .iter()
        .any(|t| trimmed.to_lowercase().contains(&t.to_lowercase()))
    {
        return Some(LineRejection::LeakedMarkup);
    }
    if SECTION_HEADER.is_match(trimmed) {
        return Some(LineRejection::SectionHeader);
    }
    if ANNOTATION.is_match(trimmed) {
        return Some(LineRejection::Annotation);
    }
    if starts_with_cooking_verb(trimmed) {
        return Some(LineRejection::CookingVerb);
    }
    if is_full_sentence(trimmed) {
        return Some(LineRejection::FullSentence);
    }
    None
}

fn starts_with_cooking_verb(line: &str) -> bool {
    let lower = line.to_lowercase();
    let mut words = lower.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    let first = first.trim_matches(|c: char| !c.is_alphanumeric());
    if COOKING_VERBS.contains(first) {
        return true;
    }
    // Two-word openers like "bring to a boil".
    matches!((first, words.next()), ("bring", Some("to")))
}

/// A full sentence masquerading as an ingredient: ends with a period, has
/// at least six words, and carries an action verb somewhere.
fn is_full_sentence(line: &str) -> bool {
    line.ends_with('.')
        && line.split_whitespace().count() >= 6
        && ACTION_VERB.is_match(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::preheat("Preheat the oven to 350F", Some(LineRejection::CookingVerb))]
    #[case::bring_to("Bring to a boil", Some(LineRejection::CookingVerb))]
    #[case::header_for_the("For the filling", Some(LineRejection::SectionHeader))]
    #[case::header_for_topping("for topping:", Some(LineRejection::SectionHeader))]
    #[case::header_prep("Preparation", Some(LineRejection::SectionHeader))]
    #[case::header_instructions("Instructions:", Some(LineRejection::SectionHeader))]
    #[case::annotation_taste("to taste", Some(LineRejection::Annotation))]
    #[case::annotation_optional("optional", Some(LineRejection::Annotation))]
    #[case::annotation_needed("as needed", Some(LineRejection::Annotation))]
    #[case::annotation_serves("(Serves 2)", Some(LineRejection::Annotation))]
    #[case::markup_bold("**1 cup flour**", Some(LineRejection::LeakedMarkup))]
    #[case::markup_amp("salt &amp; pepper", Some(LineRejection::LeakedMarkup))]
    #[case::markup_video("[video] how to fold", Some(LineRejection::LeakedMarkup))]
    #[case::sentence(
        "Stir the mixture until it thickens and serve hot.",
        Some(LineRejection::CookingVerb)
    )]
    #[case::sentence_not_verb_first(
        "The mixture should then be stirred gently until you add the cream.",
        Some(LineRejection::FullSentence)
    )]
    #[case::keeps_flour("2 cups all-purpose flour", None)]
    #[case::keeps_eggplant("1 Eggplant cut into cubes", None)]
    #[case::keeps_pancetta("4oz pancetta", None)]
    #[case::keeps_salt("salt", None)]
    fn filter_cases(#[case] line: &str, #[case] expected: Option<LineRejection>) {
        assert_eq!(reject_reason(line), expected);
    }

    #[test]
    fn rejects_very_long_lines() {
        let line = "chopped nuts, ".repeat(20);
        assert_eq!(reject_reason(&line), Some(LineRejection::TooLong));
    }
}
