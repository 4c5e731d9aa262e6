// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CartoCSS-like styling: rules, selectors, filters and typed properties.
//!
//! A [`RuleList`] is matched against a layer and then against each feature,
//! and the matching rules are collapsed into one [`Rule`] whose typed accessors
//! ([`Rule::color`], [`Rule::number`], ...) apply the documented default of each
//! [`Property`].

mod filter;
mod property;
mod rule;
mod value;

pub use filter::{CompareOp, Filter};
pub use property::{Property, ValueKind};
pub use rule::{Rule, RuleList, Selector};
pub use value::Value;
