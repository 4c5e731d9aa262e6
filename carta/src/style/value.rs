// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property values and their coercions.

use std::borrow::Cow;

use peniko::color::{parse_color, Srgb};
use peniko::Color;

use crate::source::{AttrValue, Feature};

/// A property value as written in a style.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `true` or `false`.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A list of numbers, such as a dash array.
    Numbers(Vec<f64>),
    /// A colour.
    Color(Color),
    /// Quoted text.
    Text(String),
    /// A bare word, such as `round` or `multiply`.
    Keyword(String),
    /// `[name]`: the value of a feature attribute.
    Attribute(String),
}

impl Value {
    /// A bare word.
    pub fn keyword(s: impl Into<String>) -> Self {
        Self::Keyword(s.into())
    }

    /// Quoted text.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// A reference to the feature attribute `name`.
    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    /// Parse a value written in CartoCSS syntax.
    ///
    /// Recognises `[attr]` references, quoted strings, booleans, numbers,
    /// comma separated number lists, colours, and falls back to a keyword.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(name) = s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return Self::attr(name.trim());
        }
        for q in ['"', '\''] {
            if let Some(t) = s.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
                return Self::text(t);
            }
        }
        match s {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(n) = s.parse::<f64>() {
            return Self::Number(n);
        }
        if s.contains(',') && !s.contains('(') {
            if let Some(ns) = parse_numbers(s) {
                return Self::Numbers(ns);
            }
        }
        if let Some(c) = color_from_str(s) {
            return Self::Color(c);
        }
        Self::keyword(s)
    }

    /// Substitute attribute references with the feature's value.
    ///
    /// Returns `None` for a reference when there is no feature, the feature
    /// has no such attribute, or the attribute is null.
    pub fn resolve<'a>(&'a self, feature: Option<&Feature>) -> Option<Cow<'a, Self>> {
        let Self::Attribute(name) = self else {
            return Some(Cow::Borrowed(self));
        };
        let value = match feature?.attribute(name)? {
            AttrValue::Null => return None,
            AttrValue::Bool(b) => Self::Bool(*b),
            AttrValue::Number(n) => Self::Number(*n),
            AttrValue::Text(t) => Self::Text(t.clone()),
        };
        Some(Cow::Owned(value))
    }

    /// Coerce to a colour. Text and keywords are parsed as CSS colours.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            Self::Text(s) | Self::Keyword(s) => color_from_str(s),
            _ => None,
        }
    }

    /// Coerce to a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Numbers(ns) if ns.len() == 1 => Some(ns[0]),
            Self::Text(s) | Self::Keyword(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a list of numbers.
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numbers(ns) => Some(ns.clone()),
            Self::Number(n) => Some(vec![*n]),
            Self::Text(s) | Self::Keyword(s) => parse_numbers(s),
            _ => None,
        }
    }

    /// Coerce to text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) | Self::Keyword(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Coerce to a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            Self::Text(s) | Self::Keyword(s) => match s.trim() {
                s if s.eq_ignore_ascii_case("true") => Some(true),
                s if s.eq_ignore_ascii_case("false") => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

fn color_from_str(s: &str) -> Option<Color> {
    parse_color(s.trim())
        .ok()
        .map(|c| c.to_alpha_color::<Srgb>())
}

fn parse_numbers(s: &str) -> Option<Vec<f64>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse().ok())
        .collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Vec<f64>> for Value {
    fn from(ns: Vec<f64>) -> Self {
        Self::Numbers(ns)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}
