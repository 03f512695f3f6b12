//! Metadata scanning: timings, servings, difficulty and cuisine mentions
//! anywhere in the text. Values stay raw strings; coercion happens in the
//! repair pass.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct MetadataScan {
    pub prep: Option<String>,
    pub cook: Option<String>,
    pub total: Option<String>,
    pub servings: Option<String>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
}

static PREP_TIME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)^.*?prep(?:aration)?\s+time:?\s*([^|\n]+)").expect("invalid prep pattern")
});

static COOK_TIME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)^.*?cook(?:ing)?\s+time:?\s*([^|\n]+)").expect("invalid cook pattern")
});

static TOTAL_TIME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)^.*?total\s+time:?\s*([^|\n]+)").expect("invalid total pattern")
});

static SERVINGS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)(?:servings|serves|yield)s?:?\s*\(?\s*([\d][\d\s/.\-–]*)")
        .expect("invalid servings pattern")
});

static DIFFICULTY: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)^.*?difficulty:?\s*([^|\n]+)").expect("invalid difficulty pattern")
});

const CUISINES: [&str; 20] = [
    "italian",
    "sicilian",
    "mexican",
    "chinese",
    "indian",
    "thai",
    "japanese",
    "french",
    "american",
    "mediterranean",
    "korean",
    "vietnamese",
    "greek",
    "spanish",
    "lebanese",
    "moroccan",
    "german",
    "cajun",
    "filipino",
    "caribbean",
];

pub fn scan_metadata(text: &str) -> MetadataScan {
    MetadataScan {
        prep: capture(&PREP_TIME, text),
        cook: capture(&COOK_TIME, text),
        total: capture(&TOTAL_TIME, text),
        servings: capture(&SERVINGS, text),
        difficulty: capture(&DIFFICULTY, text),
        cuisine: find_cuisine(text),
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Earliest cuisine keyword mention wins, capitalized for display.
fn find_cuisine(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    CUISINES
        .iter()
        .filter_map(|c| lower.find(c).map(|pos| (pos, *c)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, c)| {
            let mut chars = c.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scans_time_lines() {
        let text = "Prep time: 15 minutes\nCook Time: 30-45 minutes\nTotal time: 1 hour\n";
        let scan = scan_metadata(text);
        assert_eq!(scan.prep.as_deref(), Some("15 minutes"));
        assert_eq!(scan.cook.as_deref(), Some("30-45 minutes"));
        assert_eq!(scan.total.as_deref(), Some("1 hour"));
    }

    #[test]
    fn scans_servings_variants() {
        assert_eq!(
            scan_metadata("Servings: 2-4").servings.as_deref(),
            Some("2-4")
        );
        assert_eq!(scan_metadata("(Serves 2)").servings.as_deref(), Some("2"));
        assert_eq!(
            scan_metadata("Yield: 24 cookies").servings.as_deref(),
            Some("24")
        );
    }

    #[test]
    fn scans_difficulty_and_cuisine() {
        let scan = scan_metadata("Difficulty: super easy\nA Sicilian classic with eggplant.");
        assert_eq!(scan.difficulty.as_deref(), Some("super easy"));
        assert_eq!(scan.cuisine.as_deref(), Some("Sicilian"));
    }

    #[test]
    fn absent_metadata_stays_absent() {
        let scan = scan_metadata("Just a story about soup.");
        assert_eq!(scan.prep, None);
        assert_eq!(scan.servings, None);
        assert_eq!(scan.difficulty, None);
    }
}
