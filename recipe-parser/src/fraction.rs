//! Quantity span recognition.
//!
//! Unlike a numeric parser, these combinators *recognize* the span of text
//! that makes up a quantity and hand it back verbatim: ranges (`2-4`),
//! mixed numbers (`1 1/2`, `1½`), vulgar fractions and decimals all stay
//! strings until the store needs a number.

use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of, satisfy, space0},
    combinator::{opt, recognize},
    error::context,
    IResult, Parser,
};
use nom_language::error::VerboseError;

use recipe_model::coerce::vulgar_fraction;

pub(crate) type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

fn is_vulgar(c: char) -> bool {
    vulgar_fraction(c).is_some()
}

/// `½`, `¼`, …
fn vulgar_char(input: &str) -> Res<'_, &str> {
    context("vulgar_char", recognize(satisfy(is_vulgar))).parse(input)
}

/// `1/2`, `3/4`
fn slash_fraction(input: &str) -> Res<'_, &str> {
    context("slash_fraction", recognize((digit1, char('/'), digit1))).parse(input)
}

/// `1.5`
fn decimal(input: &str) -> Res<'_, &str> {
    context("decimal", recognize((digit1, char('.'), digit1))).parse(input)
}

/// A single quantity: mixed number, fraction, decimal or integer.
/// Longest form first so `1 1/2` doesn't stop at `1`.
pub(crate) fn simple_quantity(input: &str) -> Res<'_, &str> {
    context(
        "simple_quantity",
        alt((
            recognize((digit1, char(' '), slash_fraction)),
            recognize((digit1, opt(char(' ')), vulgar_char)),
            slash_fraction,
            vulgar_char,
            decimal,
            digit1,
        )),
    )
    .parse(input)
}

/// A quantity or a quantity range: `2-4`, `30 - 45`, `1½`.
/// The range is preserved as one span; the low end is taken only when a
/// numeric value is required downstream.
pub(crate) fn quantity_span(input: &str) -> Res<'_, &str> {
    context(
        "quantity_span",
        alt((
            recognize((
                simple_quantity,
                space0,
                one_of("-–"),
                space0,
                simple_quantity,
            )),
            simple_quantity,
        )),
    )
    .parse(input)
}
