//! Recursive-descent parser for single-column SQL fragments.
//!
//! Grammar (ASCII, no whitespace except the single space before a tail):
//!
//! ```text
//! fragment := { word "(" } word { "." word } { ")" } [ " " tail ]
//! tail     := [ "NOT " ] "IN (" rest
//!           | [ "!" ] "= null"
//!           | "LIKE %s"
//!           | ( "ASC" | "DESC" ) [ " NULLS " ( "FIRST" | "LAST" ) ]
//!           | op " %s"            op := one or more of ! < > =
//!           | word                (column alias)
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{eof, map, opt, rest},
    multi::{many0, separated_list1},
    sequence::{preceded, terminated},
    IResult, Parser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentTail<'a> {
    Alias(&'a str),
    Comparison(&'a str),
    Like,
    NullCheck { negated: bool },
    InList { negated: bool, items: &'a str },
    Ordering { descending: bool, nulls: Option<&'a str> },
}

/// A parsed fragment. `prefix` and `suffix` are verbatim slices of the input
/// so that reassembly never alters anything outside the dotted core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFragment<'a> {
    pub prefix: &'a str,
    pub functions: Vec<&'a str>,
    pub core: Vec<&'a str>,
    pub suffix: &'a str,
    pub tail: Option<FragmentTail<'a>>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char).parse(input)
}

fn function_open(input: &str) -> IResult<&str, &str> {
    terminated(word, char('(')).parse(input)
}

fn in_list(input: &str) -> IResult<&str, FragmentTail<'_>> {
    map(
        (opt(tag("NOT ")), tag("IN ("), rest),
        |(not, _, items): (Option<&str>, &str, &str)| FragmentTail::InList {
            negated: not.is_some(),
            items,
        },
    )
    .parse(input)
}

fn null_check(input: &str) -> IResult<&str, FragmentTail<'_>> {
    map((opt(char('!')), tag("= null")), |(bang, _)| {
        FragmentTail::NullCheck {
            negated: bang.is_some(),
        }
    })
    .parse(input)
}

fn like(input: &str) -> IResult<&str, FragmentTail<'_>> {
    map(tag("LIKE %s"), |_| FragmentTail::Like).parse(input)
}

fn ordering(input: &str) -> IResult<&str, FragmentTail<'_>> {
    map(
        (
            alt((tag("ASC"), tag("DESC"))),
            opt(preceded(tag(" NULLS "), alt((tag("FIRST"), tag("LAST"))))),
        ),
        |(direction, nulls)| FragmentTail::Ordering {
            descending: direction == "DESC",
            nulls,
        },
    )
    .parse(input)
}

fn comparison(input: &str) -> IResult<&str, FragmentTail<'_>> {
    map(
        terminated(take_while1(|c: char| "!<>=".contains(c)), tag(" %s")),
        FragmentTail::Comparison,
    )
    .parse(input)
}

fn fragment_tail(input: &str) -> IResult<&str, FragmentTail<'_>> {
    // each branch must reach the end of input, so a prefix match such as
    // "DESC" inside the alias "DESCRIPTION" falls through to the next one
    alt((
        terminated(in_list, eof),
        terminated(null_check, eof),
        terminated(like, eof),
        terminated(ordering, eof),
        terminated(comparison, eof),
        terminated(map(word, FragmentTail::Alias), eof),
    ))
    .parse(input)
}

pub fn parse_field_fragment(input: &str) -> IResult<&str, FieldFragment<'_>> {
    let (after_prefix, functions) = many0(function_open).parse(input)?;
    let prefix = &input[..input.len() - after_prefix.len()];

    let (after_core, core) = separated_list1(char('.'), word).parse(after_prefix)?;
    let suffix = after_core;

    let (remaining, _) = many0(char(')')).parse(after_core)?;
    let (remaining, tail) = alt((
        map(eof, |_| None),
        map(preceded(char(' '), fragment_tail), Some),
    ))
    .parse(remaining)?;

    Ok((
        remaining,
        FieldFragment {
            prefix,
            functions,
            core,
            suffix,
            tail,
        },
    ))
}
