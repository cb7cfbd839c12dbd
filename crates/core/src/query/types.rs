//! Query and scan request types.

use crate::codec::{Record, Value};

/// Iteration direction over an index's range key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn is_forward(&self) -> bool {
        matches!(self, Direction::Ascending)
    }
}

/// Resume point of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Inclusive, expressed as a value of the first unbound range component.
    StartingAt(Value),
    /// Exclusive, derived from a previously returned record's own key.
    StartingAfter(Record),
}

/// Comparison applied to one range key component.
#[derive(Debug, Clone, PartialEq)]
pub enum RangePredicate {
    Eq(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    Between(Value, Value),
    /// String components only.
    BeginsWith(String),
}

/// A query against the primary key or a secondary index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Index name; empty for the primary table key.
    pub index: String,
    pub equals: Vec<(String, Value)>,
    pub range: Option<(String, RangePredicate)>,
    pub direction: Direction,
    pub starting_at: Option<Value>,
    pub starting_after: Option<Record>,
    pub limit: Option<usize>,
    pub consistent_read: bool,
}

impl QueryRequest {
    /// Query the primary table key.
    pub fn primary() -> Self {
        Self::default()
    }

    /// Query a secondary index.
    pub fn on_index(name: impl Into<String>) -> Self {
        Self {
            index: name.into(),
            ..Self::default()
        }
    }

    /// Add an equality predicate on a hash or leading range component.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn range(mut self, field: impl Into<String>, predicate: RangePredicate) -> Self {
        self.range = Some((field.into(), predicate));
        self
    }

    pub fn descending(mut self) -> Self {
        self.direction = Direction::Descending;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn starting_at(mut self, value: impl Into<Value>) -> Self {
        self.starting_at = Some(value.into());
        self
    }

    pub fn starting_after(mut self, record: Record) -> Self {
        self.starting_after = Some(record);
        self
    }

    /// Apply a cursor.
    pub fn cursor(self, cursor: Cursor) -> Self {
        match cursor {
            Cursor::StartingAt(value) => self.starting_at(value),
            Cursor::StartingAfter(record) => self.starting_after(record),
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }
}

/// A scan over the table or a secondary index. No ordering guarantee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub index: String,
    pub consistent_read: bool,
    pub limit: Option<usize>,
}

impl ScanRequest {
    pub fn table() -> Self {
        Self::default()
    }

    pub fn on_index(name: impl Into<String>) -> Self {
        Self {
            index: name.into(),
            ..Self::default()
        }
    }

    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
