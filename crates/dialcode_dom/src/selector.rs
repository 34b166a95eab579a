//! Compound selectors
//!
//! Supports the subset needed to locate third-party widget parts:
//! an optional tag followed by any number of `.class`, `[attr]` and
//! `[attr=value]` parts, e.g. `li.country-item[data-country]`.
//! Combinators and pseudo-classes are not supported.

use nom::{
    branch::alt,
    bytes::complete::{take_until, take_while1},
    character::complete::char,
    combinator::{all_consuming, map, opt},
    multi::many0,
    sequence::{delimited, pair, preceded},
    Finish, IResult,
};
use smallvec::SmallVec;

use crate::error::{DomError, Result};
use crate::node::Element;

/// One `.class` or `[attr]` part of a compound selector
#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Class(String),
    Attr { name: String, value: Option<String> },
}

/// A parsed compound selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    parts: SmallVec<[Part; 2]>,
}

impl Selector {
    /// Parse a compound selector string
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (_, (tag, parts)) = all_consuming(compound)(trimmed)
            .finish()
            .map_err(|_: nom::error::Error<&str>| DomError::InvalidSelector(input.to_string()))?;

        if tag.is_none() && parts.is_empty() {
            return Err(DomError::InvalidSelector(input.to_string()));
        }

        Ok(Self {
            tag: tag.map(|t| t.to_ascii_lowercase()),
            parts: parts.into_iter().collect(),
        })
    }

    /// Selector matching any element carrying `class`
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            tag: None,
            parts: SmallVec::from_iter([Part::Class(class.into())]),
        }
    }

    /// Selector matching any element carrying attribute `name`
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            tag: None,
            parts: SmallVec::from_iter([Part::Attr {
                name: name.into(),
                value: None,
            }]),
        }
    }

    /// Narrow the selector with an additional class
    pub fn and_class(mut self, class: impl Into<String>) -> Self {
        self.parts.push(Part::Class(class.into()));
        self
    }

    /// Narrow the selector with an attribute presence check
    pub fn and_attribute(mut self, name: impl Into<String>) -> Self {
        self.parts.push(Part::Attr {
            name: name.into(),
            value: None,
        });
        self
    }

    pub(crate) fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag != *tag {
                return false;
            }
        }
        self.parts.iter().all(|part| match part {
            Part::Class(c) => el.has_class(c),
            Part::Attr { name, value: None } => el.attributes.contains_key(name),
            Part::Attr {
                name,
                value: Some(v),
            } => el.attributes.get(name) == Some(v),
        })
    }
}

impl std::str::FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn attr_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
        identifier,
    ))(input)
}

fn class_part(input: &str) -> IResult<&str, Part> {
    map(preceded(char('.'), identifier), |c: &str| {
        Part::Class(c.to_string())
    })(input)
}

fn attr_part(input: &str) -> IResult<&str, Part> {
    map(
        delimited(
            char('['),
            pair(identifier, opt(preceded(char('='), attr_value))),
            char(']'),
        ),
        |(name, value): (&str, Option<&str>)| Part::Attr {
            name: name.to_string(),
            value: value.map(str::to_string),
        },
    )(input)
}

fn compound(input: &str) -> IResult<&str, (Option<&str>, Vec<Part>)> {
    pair(opt(identifier), many0(alt((class_part, attr_part))))(input)
}
