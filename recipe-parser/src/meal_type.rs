//! Meal-type scoring.
//!
//! Tally keyword hits per category over the whole text. Main-course
//! indicators carry double weight so a savory dish with a sweet glaze
//! ("brats with caramelized onions and a brown sugar rub") lands on dinner,
//! not dessert.

use recipe_model::MealType;

const MAIN_COURSE: [&str; 18] = [
    "meat", "chicken", "beef", "pork", "lamb", "fish", "salmon", "shrimp", "pasta", "rice",
    "noodle", "curry", "brat", "sausage", "steak", "stew", "roast", "casserole",
];

const DESSERT: [&str; 13] = [
    "dessert", "cake", "cookie", "brownie", "chocolate", "frosting", "mousse", "pudding", "pie",
    "custard", "caramel", "sweet", "ice cream",
];

const BREAKFAST: [&str; 8] = [
    "breakfast",
    "pancake",
    "waffle",
    "oatmeal",
    "granola",
    "brunch",
    "omelet",
    "frittata",
];

const LUNCH: [&str; 4] = ["lunch", "sandwich", "wrap", "salad"];

const SNACK: [&str; 5] = ["snack", "dip", "bites", "appetizer", "cracker"];

const MAIN_COURSE_WEIGHT: u32 = 2;

/// Score the text against all categories; highest tally wins, no hits at
/// all yields `None`.
pub fn score_meal_type(text: &str) -> Option<MealType> {
    let lower = text.to_lowercase();
    let hits = |keywords: &[&str]| -> u32 { keywords.iter().filter(|k| lower.contains(**k)).count() as u32 };

    let scores = [
        (MealType::Dinner, hits(&MAIN_COURSE) * MAIN_COURSE_WEIGHT),
        (MealType::Dessert, hits(&DESSERT)),
        (MealType::Breakfast, hits(&BREAKFAST)),
        (MealType::Lunch, hits(&LUNCH)),
        (MealType::Snack, hits(&SNACK)),
    ];

    scores
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
        .map(|(meal, _)| meal)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::dessert_only("chocolate chip cookie dough", Some(MealType::Dessert))]
    #[case::dinner_only("pan-fried chicken with rice", Some(MealType::Dinner))]
    #[case::main_outweighs_dessert(
        "beer brats with caramelized onions and a brown sugar rub",
        Some(MealType::Dinner)
    )]
    #[case::breakfast("fluffy pancake stack for brunch", Some(MealType::Breakfast))]
    #[case::lunch("a crunchy chickpea salad sandwich", Some(MealType::Lunch))]
    #[case::nothing("a glass of water", None)]
    fn scoring(#[case] text: &str, #[case] expected: Option<MealType>) {
        assert_eq!(score_meal_type(text), expected);
    }
}
