//! Best-effort label matcher extraction from PromQL text.
//!
//! Only equality matchers (`name="value"` / `name='value'`) are recognised.
//! Regex (`=~`, `!~`) and negative (`!=`) matchers never match the pattern and
//! are ignored. The query is never checked for validity.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static EQUALITY_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("equality matcher regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelValue {
    Single(String),
    Multiple(Vec<String>),
}

impl LabelValue {
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.values().iter().any(|value| value == candidate)
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

/// Every equality matcher found in `query`, keyed by label name. Repeated
/// names accumulate in encounter order.
pub fn parse_label_selectors(query: &str) -> HashMap<String, LabelValue> {
    let mut selectors: HashMap<String, LabelValue> = HashMap::new();
    for caps in EQUALITY_MATCHER.captures_iter(query) {
        let name = caps[1].to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        match selectors.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                selectors.insert(name, LabelValue::Single(value));
            }
        }
    }
    selectors
}

/// Filter view over parsed selectors. A label absent from the query matches anything.
#[derive(Debug, Clone, Default)]
pub struct LabelFilter {
    selectors: HashMap<String, LabelValue>,
}

impl LabelFilter {
    pub fn from_query(query: &str) -> Self {
        Self {
            selectors: parse_label_selectors(query),
        }
    }

    pub fn allows(&self, label: &str, value: &str) -> bool {
        self.selectors
            .get(label)
            .map_or(true, |wanted| wanted.contains(value))
    }
}
