//! Key conditions over encoded key attributes.

use std::collections::HashMap;

use crate::codec::{AttributeValue, Item};

/// Comparison on an encoded range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOp {
    Eq(String),
    Lt(String),
    Le(String),
    Gt(String),
    Ge(String),
    /// Inclusive on both ends.
    Between(String, String),
    BeginsWith(String),
}

impl RangeOp {
    /// Whether an encoded range value satisfies the comparison.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            RangeOp::Eq(v) => value == v,
            RangeOp::Lt(v) => value < v.as_str(),
            RangeOp::Le(v) => value <= v.as_str(),
            RangeOp::Gt(v) => value > v.as_str(),
            RangeOp::Ge(v) => value >= v.as_str(),
            RangeOp::Between(lo, hi) => value >= lo.as_str() && value <= hi.as_str(),
            RangeOp::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeKeyCondition {
    pub attribute: String,
    pub op: RangeOp,
}

/// Hash key equality plus an optional range key comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    pub hash_attribute: String,
    pub hash_value: String,
    pub range: Option<RangeKeyCondition>,
}

/// A key condition rendered with `#name` / `:value` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, String>,
}

impl KeyCondition {
    pub fn new(hash_attribute: impl Into<String>, hash_value: impl Into<String>) -> Self {
        Self {
            hash_attribute: hash_attribute.into(),
            hash_value: hash_value.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, attribute: impl Into<String>, op: RangeOp) -> Self {
        self.range = Some(RangeKeyCondition {
            attribute: attribute.into(),
            op,
        });
        self
    }

    /// Whether a stored item satisfies the condition. Items missing a key
    /// attribute never match (sparse indexes).
    pub fn matches(&self, item: &Item) -> bool {
        let string_attr = |name: &str| match item.get(name) {
            Some(AttributeValue::S(s)) => Some(s.as_str()),
            _ => None,
        };

        if string_attr(&self.hash_attribute) != Some(self.hash_value.as_str()) {
            return false;
        }
        match &self.range {
            None => true,
            Some(range) => string_attr(&range.attribute).is_some_and(|v| range.op.matches(v)),
        }
    }

    /// Render as a native key condition expression.
    pub fn expression(&self) -> KeyExpression {
        let mut names = HashMap::from([("#pk".to_string(), self.hash_attribute.clone())]);
        let mut values = HashMap::from([(":pk".to_string(), self.hash_value.clone())]);
        let mut expression = "#pk = :pk".to_string();

        if let Some(range) = &self.range {
            names.insert("#sk".to_string(), range.attribute.clone());
            let clause = match &range.op {
                RangeOp::Eq(v) => single(&mut values, "=", v),
                RangeOp::Lt(v) => single(&mut values, "<", v),
                RangeOp::Le(v) => single(&mut values, "<=", v),
                RangeOp::Gt(v) => single(&mut values, ">", v),
                RangeOp::Ge(v) => single(&mut values, ">=", v),
                RangeOp::Between(lo, hi) => {
                    values.insert(":sk_lo".to_string(), lo.clone());
                    values.insert(":sk_hi".to_string(), hi.clone());
                    "#sk BETWEEN :sk_lo AND :sk_hi".to_string()
                }
                RangeOp::BeginsWith(prefix) => {
                    values.insert(":sk".to_string(), prefix.clone());
                    "begins_with(#sk, :sk)".to_string()
                }
            };
            expression = format!("{expression} AND {clause}");
        }

        KeyExpression {
            expression,
            names,
            values,
        }
    }
}

fn single(values: &mut HashMap<String, String>, op: &str, value: &str) -> String {
    values.insert(":sk".to_string(), value.to_string());
    format!("#sk {op} :sk")
}
