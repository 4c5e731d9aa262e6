// Copyright 2025 the Carta Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style rules and rule lists.

use std::collections::BTreeMap;

use peniko::Color;

use super::{Filter, Property, Value};
use crate::source::Feature;

/// Which layers, features or map a [`Rule`] applies to.
///
/// `Map { ... }` is a selector with name `Map`, `#roads[kind = 'highway']` one
/// with id `roads` and a filter, `*` the wildcard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    /// Type name, such as `Map`.
    pub name: Option<String>,
    /// Layer id.
    pub id: Option<String>,
    /// Class names.
    pub classes: Vec<String>,
    /// Attribute filter applied to features.
    pub filter: Filter,
    /// `*`
    pub wildcard: bool,
}

impl Selector {
    /// `*`
    pub fn any() -> Self {
        Self {
            wildcard: true,
            ..Default::default()
        }
    }

    /// Select by type name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Select by id.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Add a class.
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Restrict to features matching `filter`.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = core::mem::take(&mut self.filter).and(filter);
        self
    }

    /// Whether `feature` passes this selector's filter.
    pub fn matches(&self, feature: &Feature) -> bool {
        self.filter.matches(feature)
    }

    /// The selector of a rule nested in a rule selected by `self`.
    fn nest(&self, child: &Self) -> Self {
        let mut classes = self.classes.clone();
        for c in &child.classes {
            if !classes.contains(c) {
                classes.push(c.clone());
            }
        }
        Self {
            name: child.name.clone().or_else(|| self.name.clone()),
            id: child.id.clone().or_else(|| self.id.clone()),
            classes,
            filter: self.filter.clone().and(child.filter.clone()),
            wildcard: self.wildcard && child.wildcard,
        }
    }
}

/// A set of property declarations with the selectors they apply to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    /// Selectors; the rule applies if any of them does.
    pub selectors: Vec<Selector>,
    properties: BTreeMap<Property, Value>,
    /// Rules nested inside this one.
    pub nested: Vec<Rule>,
}

impl Rule {
    /// A rule with one selector and no properties.
    pub fn new(selector: Selector) -> Self {
        Self {
            selectors: vec![selector],
            ..Default::default()
        }
    }

    /// Also apply to `selector`.
    #[must_use]
    pub fn or_selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Declare `property: value`.
    #[must_use]
    pub fn with(mut self, property: Property, value: impl Into<Value>) -> Self {
        self.put(property, value);
        self
    }

    /// Nest `rule` inside this one.
    #[must_use]
    pub fn nest(mut self, rule: Self) -> Self {
        self.nested.push(rule);
        self
    }

    /// Declare `property: value`, replacing any earlier declaration.
    pub fn put(&mut self, property: Property, value: impl Into<Value>) {
        self.properties.insert(property, value.into());
    }

    /// The declared value of `property`, without defaults.
    pub fn get(&self, property: Property) -> Option<&Value> {
        self.properties.get(&property)
    }

    /// Whether `property` is declared.
    pub fn has(&self, property: Property) -> bool {
        self.properties.contains_key(&property)
    }

    /// All declarations in property order.
    pub fn properties(&self) -> impl Iterator<Item = (Property, &Value)> {
        self.properties.iter().map(|(p, v)| (*p, v))
    }

    /// Coerce the declared value of `property` with `coerce`, falling back to the
    /// property's documented default when it is not declared, refers to a
    /// missing attribute, or cannot be coerced.
    fn eval<T>(
        &self,
        property: Property,
        feature: Option<&Feature>,
        coerce: impl Fn(&Value) -> Option<T>,
    ) -> Option<T> {
        let declared = self.get(property).and_then(|v| v.resolve(feature));
        if let Some(v) = declared {
            if let Some(t) = coerce(&*v) {
                return Some(t);
            }
            tracing::debug!(%property, value = ?v, "unusable style value, using default");
        }
        property.default_value().as_ref().and_then(coerce)
    }

    /// `property` as a colour.
    pub fn color(&self, property: Property, feature: Option<&Feature>) -> Option<Color> {
        self.eval(property, feature, Value::as_color)
    }

    /// `property` as a number.
    pub fn number(&self, property: Property, feature: Option<&Feature>) -> Option<f64> {
        self.eval(property, feature, Value::as_number)
    }

    /// `property` as a list of numbers.
    pub fn numbers(&self, property: Property, feature: Option<&Feature>) -> Option<Vec<f64>> {
        self.eval(property, feature, Value::as_numbers)
    }

    /// `property` as text.
    pub fn string(&self, property: Property, feature: Option<&Feature>) -> Option<String> {
        self.eval(property, feature, Value::as_text)
    }

    /// `property` as a boolean.
    pub fn boolean(&self, property: Property, feature: Option<&Feature>) -> Option<bool> {
        self.eval(property, feature, Value::as_bool)
    }

    fn matches_feature(&self, feature: &Feature) -> bool {
        self.selectors.is_empty() || self.selectors.iter().any(|s| s.matches(feature))
    }

    fn flatten_into(&self, parents: &[Selector], out: &mut Vec<Self>) {
        let selectors: Vec<Selector> = if parents.is_empty() {
            self.selectors.clone()
        } else if self.selectors.is_empty() {
            parents.to_vec()
        } else {
            parents
                .iter()
                .flat_map(|p| self.selectors.iter().map(|s| p.nest(s)))
                .collect()
        };
        if !self.properties.is_empty() || self.nested.is_empty() {
            out.push(Self {
                selectors: selectors.clone(),
                properties: self.properties.clone(),
                nested: Vec::new(),
            });
        }
        for child in &self.nested {
            child.flatten_into(&selectors, out);
        }
    }
}

/// An ordered list of rules. Later rules take precedence when collapsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleList(Vec<Rule>);

impl RuleList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn push(&mut self, rule: Rule) {
        self.0.push(rule);
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the rules in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    fn select(&self, wildcard: bool, pred: impl Fn(&Selector) -> bool) -> Self {
        self.0
            .iter()
            .filter(|r| r.selectors.iter().any(|s| pred(s) || (wildcard && s.wildcard)))
            .cloned()
            .collect()
    }

    /// Rules with a selector for layer `id`, plus `*` rules when `wildcard` is set.
    pub fn select_by_id(&self, id: &str, wildcard: bool) -> Self {
        self.select(wildcard, |s| s.id.as_deref() == Some(id))
    }

    /// Rules with a selector for type `name` (ignoring case), plus `*` rules when
    /// `wildcard` is set.
    pub fn select_by_name(&self, name: &str, wildcard: bool) -> Self {
        self.select(wildcard, |s| {
            s.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Rules that apply to `feature`.
    pub fn match_feature(&self, feature: &Feature) -> Self {
        self.0
            .iter()
            .filter(|r| r.matches_feature(feature))
            .cloned()
            .collect()
    }

    /// Expand nested rules into top level rules whose selectors combine the
    /// parent's and the child's. Parents come before their children.
    pub fn flatten(&self) -> Self {
        let mut out = Vec::with_capacity(self.0.len());
        for rule in &self.0 {
            rule.flatten_into(&[], &mut out);
        }
        Self(out)
    }

    /// Split into groups of equal `z-index`, lowest first. Rules keep their
    /// relative order inside a group.
    pub fn zgroup(&self) -> Vec<Self> {
        let mut keyed: Vec<(f64, &Rule)> = self
            .0
            .iter()
            .map(|r| (r.number(Property::ZIndex, None).unwrap_or(0.0), r))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut groups: Vec<(f64, Self)> = Vec::new();
        for (z, rule) in keyed {
            match groups.last_mut() {
                Some((gz, group)) if *gz == z => group.push(rule.clone()),
                _ => groups.push((z, Self(vec![rule.clone()]))),
            }
        }
        groups.into_iter().map(|(_, g)| g).collect()
    }

    /// Merge every rule's declarations into one rule, later declarations winning.
    pub fn collapse(&self) -> Rule {
        let mut properties = BTreeMap::new();
        for rule in &self.0 {
            for (p, v) in &rule.properties {
                properties.insert(*p, v.clone());
            }
        }
        Rule {
            selectors: Vec::new(),
            properties,
            nested: Vec::new(),
        }
    }
}

impl From<Vec<Rule>> for RuleList {
    fn from(rules: Vec<Rule>) -> Self {
        Self(rules)
    }
}

impl FromIterator<Rule> for RuleList {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a Rule;
    type IntoIter = core::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for RuleList {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> RuleList {
        RuleList::from(vec![
            Rule::new(Selector::name("Map")).with(Property::BackgroundColor, Color::WHITE),
            Rule::new(Selector::id("roads"))
                .with(Property::LineWidth, 1.0)
                .nest(
                    Rule::new(Selector::default().filter(Filter::equals("kind", "highway")))
                        .with(Property::LineWidth, 4.0)
                        .with(Property::ZIndex, 1.0),
                ),
            Rule::new(Selector::any()).with(Property::LineColor, Color::BLACK),
        ])
    }

    #[test]
    fn selection_by_id_and_name() {
        let rules = style();
        assert_eq!(rules.select_by_id("roads", false).len(), 1);
        assert_eq!(rules.select_by_id("roads", true).len(), 2);
        assert_eq!(rules.select_by_name("map", false).len(), 1);
        assert!(rules.select_by_id("rivers", false).is_empty());
    }

    #[test]
    fn flatten_combines_selectors() {
        let flat = style().select_by_id("roads", false).flatten();
        assert_eq!(flat.len(), 2);
        let child = flat.iter().nth(1).unwrap();
        assert_eq!(child.selectors[0].id.as_deref(), Some("roads"));
        assert_eq!(child.selectors[0].filter, Filter::equals("kind", "highway"));
    }

    #[test]
    fn matching_and_collapse() {
        let flat = style().select_by_id("roads", true).flatten();
        let highway = Feature::new("1").with_attribute("kind", "highway");
        let path = Feature::new("2").with_attribute("kind", "path");

        let hw = flat.match_feature(&highway).collapse();
        assert_eq!(hw.number(Property::LineWidth, Some(&highway)), Some(4.0));
        let p = flat.match_feature(&path).collapse();
        assert_eq!(p.number(Property::LineWidth, Some(&path)), Some(1.0));
        assert!(p.color(Property::LineColor, None).is_some());
    }

    #[test]
    fn collapse_is_idempotent() {
        let matched = style().flatten();
        let once = matched.collapse();
        assert_eq!(once, matched.collapse());
        assert_eq!(RuleList::from(vec![once.clone()]).collapse(), once);
    }

    #[test]
    fn zgroups_ascend() {
        let groups = style().select_by_id("roads", false).flatten().zgroup();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].iter().next().unwrap().get(Property::LineWidth),
            Some(&Value::Number(1.0))
        );
        assert_eq!(
            groups[1].iter().next().unwrap().get(Property::LineWidth),
            Some(&Value::Number(4.0))
        );
    }

    #[test]
    fn defaults_and_bad_values() {
        let rule = Rule::default()
            .with(Property::LineWidth, "wide")
            .with(Property::TextName, Value::attr("name"));
        assert_eq!(rule.number(Property::LineWidth, None), Some(1.0));
        assert_eq!(rule.number(Property::MarkerWidth, None), Some(10.0));
        assert_eq!(rule.number(Property::MarkerHeight, None), None);
        let f = Feature::new("x").with_attribute("name", "Oak");
        assert_eq!(rule.string(Property::TextName, Some(&f)).as_deref(), Some("Oak"));
        assert_eq!(rule.string(Property::TextName, None), None);
    }
}
