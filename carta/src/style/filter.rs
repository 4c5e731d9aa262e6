// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute predicates used by selectors and layer queries.

use core::cmp::Ordering;

use crate::source::{AttrValue, Feature};

/// Comparison operator of a [`Filter::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A predicate over feature attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches everything.
    #[default]
    True,
    /// The feature has a non-null value for the attribute.
    Has(String),
    /// Compare an attribute with a literal.
    Compare {
        /// Attribute name.
        attribute: String,
        /// Operator.
        op: CompareOp,
        /// Right hand side.
        value: AttrValue,
    },
    /// All of the filters match.
    And(Vec<Filter>),
    /// Any of the filters match.
    Or(Vec<Filter>),
    /// The filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// `[attribute] op value`
    pub fn compare(
        attribute: impl Into<String>,
        op: CompareOp,
        value: impl Into<AttrValue>,
    ) -> Self {
        Self::Compare {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    /// `[attribute] = value`
    pub fn equals(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::compare(attribute, CompareOp::Eq, value)
    }

    /// Both `self` and `other`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, f) | (f, Self::True) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, g) => Self::And(vec![f, g]),
        }
    }

    /// Whether this filter accepts everything.
    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Evaluate against `feature`.
    pub fn matches(&self, feature: &Feature) -> bool {
        match self {
            Self::True => true,
            Self::Has(name) => feature
                .attribute(name)
                .is_some_and(|v| !matches!(v, AttrValue::Null)),
            Self::Compare {
                attribute,
                op,
                value,
            } => {
                let lhs = feature.attribute(attribute).unwrap_or(&AttrValue::Null);
                let ord = compare(lhs, value);
                match op {
                    CompareOp::Eq => ord == Some(Ordering::Equal),
                    CompareOp::Ne => ord != Some(Ordering::Equal),
                    CompareOp::Lt => ord == Some(Ordering::Less),
                    CompareOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    CompareOp::Gt => ord == Some(Ordering::Greater),
                    CompareOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                }
            }
            Self::And(fs) => fs.iter().all(|f| f.matches(feature)),
            Self::Or(fs) => fs.iter().any(|f| f.matches(feature)),
            Self::Not(f) => !f.matches(feature),
        }
    }
}

/// Order two attribute values. Numbers compare numerically, also against text
/// that parses as a number; mismatched kinds are unordered.
fn compare(a: &AttrValue, b: &AttrValue) -> Option<Ordering> {
    use AttrValue::{Bool, Null, Number, Text};
    match (a, b) {
        (Null, Null) => Some(Ordering::Equal),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Number(a), Number(b)) => a.partial_cmp(b),
        (Number(a), Text(b)) => a.partial_cmp(&b.trim().parse::<f64>().ok()?),
        (Text(a), Number(b)) => a.trim().parse::<f64>().ok()?.partial_cmp(b),
        (Text(a), Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> Feature {
        Feature::new("r1")
            .with_attribute("kind", "highway")
            .with_attribute("lanes", 4.0)
            .with_attribute("ref", "12")
    }

    #[test]
    fn comparisons() {
        let f = road();
        assert!(Filter::equals("kind", "highway").matches(&f));
        assert!(!Filter::equals("kind", "path").matches(&f));
        assert!(Filter::compare("lanes", CompareOp::Ge, 4.0).matches(&f));
        assert!(Filter::compare("lanes", CompareOp::Lt, 5.0).matches(&f));
        assert!(Filter::compare("ref", CompareOp::Gt, 10.0).matches(&f));
        assert!(Filter::compare("missing", CompareOp::Ne, 1.0).matches(&f));
        assert!(!Filter::compare("missing", CompareOp::Lt, 1.0).matches(&f));
    }

    #[test]
    fn combinators() {
        let f = road();
        let both = Filter::equals("kind", "highway").and(Filter::Has("lanes".into()));
        assert!(both.matches(&f));
        assert!(!Filter::Not(Box::new(both)).matches(&f));
        assert!(Filter::Or(vec![Filter::equals("kind", "x"), Filter::True]).matches(&f));
        assert_eq!(Filter::True.and(Filter::Has("a".into())), Filter::Has("a".into()));
    }
}
