//! Section discovery in free-form recipe text.
//!
//! Finds the title, an ingredients block and an instructions block by
//! heading keywords; when the text has no headings at all, falls back to
//! line-by-line heuristics (quantity-led lines are ingredient candidates,
//! numbered or verb-led lines are instructions).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::fraction::quantity_span;
use crate::ingredient_line::strip_bullet;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Sections {
    pub title: String,
    pub preamble: Vec<String>,
    pub ingredient_lines: Vec<String>,
    pub instruction_lines: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Block {
    Preamble,
    Ingredients,
    Instructions,
}

static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^title:\s*(.+)$").expect("invalid title pattern")
});

static STEP_NUMBER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^(step\s+\d+[:.)]?|\d+[.)])\s*").expect("invalid step number pattern")
});

const INGREDIENT_HEADINGS: [&str; 2] = ["ingredients", "ingredient list"];
const INSTRUCTION_HEADINGS: [&str; 5] = [
    "instructions",
    "method",
    "directions",
    "preparation",
    "steps",
];

pub fn split_sections(text: &str) -> Sections {
    let lines: Vec<&str> = text.lines().collect();

    let title = find_title(&lines);

    let mut sections = Sections {
        title,
        ..Default::default()
    };

    let mut block = Block::Preamble;
    let mut saw_heading = false;
    let mut title_consumed = false;

    for raw in &lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !title_consumed
            && (clean_heading_text(line) == sections.title.to_lowercase()
                || TITLE_PREFIX.is_match(line))
        {
            title_consumed = true;
            continue;
        }
        if let Some(found) = heading_kind(line) {
            block = found;
            saw_heading = true;
            continue;
        }
        match block {
            Block::Ingredients => push_ingredient_fragments(&mut sections.ingredient_lines, line),
            Block::Instructions => sections.instruction_lines.push(clean_instruction(line)),
            Block::Preamble => sections
                .preamble
                .push(recipe_model::coerce::strip_markdown(line)),
        }
    }

    if !saw_heading {
        sections.preamble.clear();
        fallback_by_line(&lines, &mut sections);
    }

    sections.instruction_lines.retain(|l| !l.is_empty());
    sections
}

fn find_title(lines: &[&str]) -> String {
    for line in lines.iter().take(5) {
        if let Some(caps) = TITLE_PREFIX.captures(line.trim()) {
            if let Some(m) = caps.get(1) {
                return recipe_model::coerce::strip_markdown(m.as_str());
            }
        }
    }
    lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(recipe_model::coerce::strip_markdown)
        .unwrap_or_default()
}

/// A short line whose cleaned text starts with a section keyword.
fn heading_kind(line: &str) -> Option<Block> {
    if line.len() > 40 {
        return None;
    }
    let cleaned = clean_heading_text(line);
    if INGREDIENT_HEADINGS.iter().any(|h| cleaned.starts_with(h)) {
        return Some(Block::Ingredients);
    }
    if INSTRUCTION_HEADINGS.iter().any(|h| cleaned.starts_with(h)) {
        return Some(Block::Instructions);
    }
    None
}

fn clean_heading_text(line: &str) -> String {
    line.trim()
        .trim_start_matches(['#', '*', '-', '•', '・', ' '])
        .trim_end_matches(['*', ':', ' '])
        .to_lowercase()
}

fn has_inline_bullet(line: &str) -> bool {
    line.chars().skip(1).any(|c| c == '・' || c == '•')
}

/// Ingredient blocks sometimes arrive as one blob with inline bullets
/// (`・flour ・sugar ・matcha`); split those into separate candidates.
fn push_ingredient_fragments(out: &mut Vec<String>, line: &str) {
    if has_inline_bullet(line) {
        for fragment in line.split(['・', '•']) {
            let fragment = fragment.trim();
            if !fragment.is_empty() {
                out.push(fragment.to_string());
            }
        }
    } else {
        out.push(strip_bullet(line).to_string());
    }
}

fn clean_instruction(line: &str) -> String {
    let line = strip_bullet(line);
    let cleaned = STEP_NUMBER.replace(line, "");
    recipe_model::coerce::strip_markdown(cleaned.trim())
}

/// No headings anywhere: classify each line on its own.
fn fallback_by_line(lines: &[&str], sections: &mut Sections) {
    let mut past_title = false;
    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !past_title {
            past_title = true;
            if recipe_model::coerce::strip_markdown(line) == sections.title
                || TITLE_PREFIX.is_match(line)
            {
                continue;
            }
        }
        let stripped = strip_bullet(line);
        if looks_like_step(line) {
            sections.instruction_lines.push(clean_instruction(line));
        } else if quantity_span(stripped).is_ok() || has_inline_bullet(line) {
            push_ingredient_fragments(&mut sections.ingredient_lines, line);
        }
    }
}

fn looks_like_step(line: &str) -> bool {
    STEP_NUMBER.is_match(line) || (line.ends_with('.') && line.split_whitespace().count() >= 5)
}
