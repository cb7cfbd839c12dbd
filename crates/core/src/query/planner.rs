//! Query planning: predicates, direction and cursors to a key condition.
//!
//! Every constraint on the range key (equality prefix, range predicate,
//! cursor) is reduced to bounds over the encoded range attribute and
//! intersected. The intersection renders as a single native comparison;
//! exclusive endpoints of a `BETWEEN` are dropped client-side by the
//! pager, and an empty intersection skips the backend entirely.

use std::collections::HashMap;

use tracing::debug;

use super::condition::{KeyCondition, RangeOp};
use super::types::{QueryRequest, RangePredicate, ScanRequest};
use crate::codec::{AttributeValue, Codec, CodecError, Item, Value};
use crate::error::{Error, Result};
use crate::schema::{ComponentEncoding, EntitySchema, IndexDefinition, KeyAttribute};

/// A planned query, ready to be driven by the pager.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Secondary index name; `None` for the primary table key.
    pub index: Option<String>,
    pub key_condition: KeyCondition,
    pub scan_forward: bool,
    pub consistent_read: bool,
    pub limit: Option<usize>,
    pub filter: ResultFilter,
    /// The constraints cannot match any item; no backend call is needed.
    pub empty: bool,
}

/// A planned scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub index: Option<String>,
    pub consistent_read: bool,
    pub limit: Option<usize>,
}

/// Client-side filtering applied by the pager to backend results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// Physical position of the `StartingAfter` record; the first item at
    /// this position is dropped.
    pub skip_first: Option<Item>,
    /// Encoded range attribute the other checks apply to.
    pub range_attribute: Option<String>,
    /// Encoded range values excluded from an inclusive `BETWEEN`.
    pub excluded: Vec<String>,
    /// Prefix every encoded range value must start with.
    pub range_prefix: Option<String>,
}

impl ResultFilter {
    /// Whether an item passes the range checks.
    pub fn accepts(&self, item: &Item) -> bool {
        let Some(attribute) = &self.range_attribute else {
            return true;
        };
        let Some(AttributeValue::S(value)) = item.get(attribute) else {
            return true;
        };
        if self.excluded.iter().any(|e| e == value) {
            return false;
        }
        self.range_prefix
            .as_ref()
            .is_none_or(|prefix| value.starts_with(prefix.as_str()))
    }

    /// Whether an item sits at the `StartingAfter` position.
    pub fn is_cursor_item(&self, item: &Item) -> bool {
        self.skip_first.as_ref().is_some_and(|position| {
            position
                .iter()
                .all(|(name, value)| item.get(name) == Some(value))
        })
    }
}

/// Plan a query against the schema.
pub fn plan_query(schema: &EntitySchema, codec: &Codec, request: &QueryRequest) -> Result<QueryPlan> {
    if request.starting_at.is_some() && request.starting_after.is_some() {
        return Err(Error::InvalidCursor(
            "StartingAt and StartingAfter are mutually exclusive".to_string(),
        ));
    }

    let index = resolve_index(schema, &request.index)?;
    if index.is_gsi() && request.consistent_read {
        return Err(Error::InconsistentReadOnGsi {
            index: index.name.clone(),
        });
    }

    let equals = collect_equalities(index, request)?;
    let hash_value = encode_hash(codec, index, &equals)?;
    let mut key_condition = KeyCondition::new(&index.hash_key.name, &hash_value);
    let mut filter = ResultFilter::default();
    let mut empty = false;

    match &index.range_key {
        None => {
            if let Some((field, _)) = &request.range {
                return Err(Error::InvalidPredicate {
                    field: field.clone(),
                    reason: format!("index {} has no range key", index.label()),
                });
            }
            if request.starting_at.is_some() || request.starting_after.is_some() {
                return Err(Error::InvalidCursor(format!(
                    "index {} has no range key",
                    index.label()
                )));
            }
        }
        Some(range_key) => {
            let mut range = KeyRange::default();
            let planner = RangePlanner {
                codec,
                range_key,
                bound: leading_run(range_key, &equals)?,
            };
            let descending = !request.direction.is_forward();

            planner.apply_equalities(&mut range)?;
            if let Some((field, predicate)) = &request.range {
                planner.apply_predicate(&mut range, field, predicate)?;
            }
            if let Some(value) = &request.starting_at {
                planner.apply_starting_at(&mut range, value, descending)?;
            }
            if let Some(record) = &request.starting_after {
                let cursor_hash = codec
                    .encode_key(&index.hash_key, record)
                    .map_err(cursor_error)?;
                if cursor_hash != hash_value {
                    return Err(Error::InvalidCursor(
                        "cursor record belongs to a different hash key".to_string(),
                    ));
                }
                let position = codec
                    .encode_key(range_key, record)
                    .map_err(cursor_error)?;
                if descending {
                    range.at_most(position, true);
                } else {
                    range.at_least(position, true);
                }
                filter.skip_first = Some(
                    codec
                        .index_position(schema, index, record)
                        .map_err(cursor_error)?,
                );
            }

            let rendered = range.render();
            empty = rendered.empty;
            filter.range_attribute = Some(range_key.name.clone());
            filter.excluded = rendered.excluded;
            filter.range_prefix = rendered.residual_prefix;
            if let Some(op) = rendered.op {
                key_condition = key_condition.with_range(&range_key.name, op);
            }
        }
    }

    let plan = QueryPlan {
        index: (!index.is_primary()).then(|| index.name.clone()),
        key_condition,
        scan_forward: request.direction.is_forward(),
        consistent_read: request.consistent_read,
        limit: request.limit,
        filter,
        empty,
    };

    debug!(
        schema = schema.name(),
        index = index.label(),
        expression = %plan.key_condition.expression().expression,
        scan_forward = plan.scan_forward,
        empty = plan.empty,
        "Planned query"
    );

    Ok(plan)
}

/// Plan a scan against the table or one of its indexes.
pub fn plan_scan(schema: &EntitySchema, request: &ScanRequest) -> Result<ScanPlan> {
    let index = resolve_index(schema, &request.index)?;
    if index.is_gsi() && request.consistent_read {
        return Err(Error::InconsistentReadOnGsi {
            index: index.name.clone(),
        });
    }

    Ok(ScanPlan {
        index: (!index.is_primary()).then(|| index.name.clone()),
        consistent_read: request.consistent_read,
        limit: request.limit,
    })
}

fn resolve_index<'a>(schema: &'a EntitySchema, name: &str) -> Result<&'a IndexDefinition> {
    schema.index(name).ok_or_else(|| Error::UnknownIndex {
        schema: schema.name().to_string(),
        index: name.to_string(),
    })
}

fn collect_equalities<'a>(
    index: &IndexDefinition,
    request: &'a QueryRequest,
) -> Result<HashMap<&'a str, &'a Value>> {
    let mut equals = HashMap::new();
    for (field, value) in &request.equals {
        let is_component = index.hash_key.has_component(field)
            || index
                .range_key
                .as_ref()
                .is_some_and(|k| k.has_component(field));
        if !is_component {
            return Err(Error::InvalidPredicate {
                field: field.clone(),
                reason: format!("not a key component of index {}", index.label()),
            });
        }
        if equals.insert(field.as_str(), value).is_some() {
            return Err(Error::InvalidPredicate {
                field: field.clone(),
                reason: "more than one equality predicate".to_string(),
            });
        }
    }
    Ok(equals)
}

fn encode_hash(
    codec: &Codec,
    index: &IndexDefinition,
    equals: &HashMap<&str, &Value>,
) -> Result<String> {
    let values = index
        .hash_key
        .components
        .iter()
        .map(|c| {
            equals
                .get(c.field.as_str())
                .copied()
                .ok_or_else(|| Error::MissingHashKey {
                    index: index.label().to_string(),
                    field: c.field.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(codec.encode_key_values(&index.hash_key, &values)?)
}

/// Equality-bound leading range components, in order.
fn leading_run<'a>(range_key: &KeyAttribute, equals: &HashMap<&str, &'a Value>) -> Result<Vec<&'a Value>> {
    let mut bound = Vec::new();
    let mut gap = false;
    for component in &range_key.components {
        match equals.get(component.field.as_str()) {
            Some(value) if !gap => bound.push(*value),
            Some(_) => {
                return Err(Error::InvalidPredicate {
                    field: component.field.clone(),
                    reason: "equality predicates on range components must form a leading run"
                        .to_string(),
                });
            }
            None => gap = true,
        }
    }
    Ok(bound)
}

fn cursor_error(error: CodecError) -> Error {
    Error::InvalidCursor(error.to_string())
}

struct RangePlanner<'a> {
    codec: &'a Codec,
    range_key: &'a KeyAttribute,
    bound: Vec<&'a Value>,
}

impl RangePlanner<'_> {
    fn fully_bound(&self) -> bool {
        self.bound.len() == self.range_key.components.len()
    }

    fn apply_equalities(&self, range: &mut KeyRange) -> Result<()> {
        if self.bound.is_empty() {
            return Ok(());
        }
        if self.fully_bound() {
            let full = self.codec.encode_key_values(self.range_key, &self.bound)?;
            range.exactly(full);
        } else {
            range.with_prefix(self.codec.encode_key_prefix(self.range_key, &self.bound)?);
        }
        Ok(())
    }

    /// Encode a value of the first unbound component, including the bound
    /// prefix for composites.
    fn encode_next(&self, value: &Value) -> Result<String> {
        let component = &self.range_key.components[self.bound.len()];
        if !self.range_key.composite {
            return Ok(self
                .codec
                .encode_component(&component.field, &component.encoding, value, false)?);
        }
        let mut encoded = self.codec.encode_key_prefix(self.range_key, &self.bound)?;
        encoded.push_str(&self.codec.encode_component(
            &component.field,
            &component.encoding,
            value,
            true,
        )?);
        Ok(encoded)
    }

    /// Bounds covering exactly the keys whose next component equals the
    /// encoded value: `[enc + T, enc + succ(T))` for composites.
    fn component_bounds(&self, encoded: String) -> (String, String) {
        let mut lower = encoded.clone();
        lower.push(self.codec.terminator());
        let mut upper = encoded;
        upper.push(self.codec.terminator_successor());
        (lower, upper)
    }

    fn apply_predicate(
        &self,
        range: &mut KeyRange,
        field: &str,
        predicate: &RangePredicate,
    ) -> Result<()> {
        if self.fully_bound() {
            return Err(Error::InvalidPredicate {
                field: field.to_string(),
                reason: "range key is fully bound by equality predicates".to_string(),
            });
        }
        let component = &self.range_key.components[self.bound.len()];
        if component.field != field {
            return Err(Error::InvalidPredicate {
                field: field.to_string(),
                reason: format!("range predicate must target '{}'", component.field),
            });
        }

        if let RangePredicate::BeginsWith(prefix) = predicate {
            if component.encoding != ComponentEncoding::RawString {
                return Err(Error::InvalidPredicate {
                    field: field.to_string(),
                    reason: "begins_with applies to string components only".to_string(),
                });
            }
            range.with_prefix(self.encode_next(&Value::String(prefix.clone()))?);
            return Ok(());
        }

        if !self.range_key.composite {
            match predicate {
                RangePredicate::Eq(v) => range.exactly(self.encode_next(v)?),
                RangePredicate::Lt(v) => range.at_most(self.encode_next(v)?, false),
                RangePredicate::Le(v) => range.at_most(self.encode_next(v)?, true),
                RangePredicate::Gt(v) => range.at_least(self.encode_next(v)?, false),
                RangePredicate::Ge(v) => range.at_least(self.encode_next(v)?, true),
                RangePredicate::Between(lo, hi) => {
                    range.at_least(self.encode_next(lo)?, true);
                    range.at_most(self.encode_next(hi)?, true);
                }
                RangePredicate::BeginsWith(_) => {}
            }
            return Ok(());
        }

        match predicate {
            RangePredicate::Eq(v) => {
                let (lower, _) = self.component_bounds(self.encode_next(v)?);
                range.with_prefix(lower);
            }
            RangePredicate::Lt(v) => {
                let (lower, _) = self.component_bounds(self.encode_next(v)?);
                range.at_most(lower, false);
            }
            RangePredicate::Le(v) => {
                let (_, upper) = self.component_bounds(self.encode_next(v)?);
                range.at_most(upper, false);
            }
            RangePredicate::Gt(v) => {
                let (_, upper) = self.component_bounds(self.encode_next(v)?);
                range.at_least(upper, true);
            }
            RangePredicate::Ge(v) => {
                let (lower, _) = self.component_bounds(self.encode_next(v)?);
                range.at_least(lower, true);
            }
            RangePredicate::Between(lo, hi) => {
                let (lower, _) = self.component_bounds(self.encode_next(lo)?);
                let (_, upper) = self.component_bounds(self.encode_next(hi)?);
                range.at_least(lower, true);
                range.at_most(upper, false);
            }
            RangePredicate::BeginsWith(_) => {}
        }
        Ok(())
    }

    fn apply_starting_at(&self, range: &mut KeyRange, value: &Value, descending: bool) -> Result<()> {
        if self.fully_bound() {
            return Err(Error::InvalidCursor(
                "StartingAt needs an unbound range key component".to_string(),
            ));
        }
        let encoded = self.encode_next(value)?;
        match (self.range_key.composite, descending) {
            (false, false) => range.at_least(encoded, true),
            (false, true) => range.at_most(encoded, true),
            (true, false) => range.at_least(self.component_bounds(encoded).0, true),
            (true, true) => range.at_most(self.component_bounds(encoded).1, false),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    value: String,
    inclusive: bool,
}

/// Intersection of constraints over an encoded range attribute.
#[derive(Debug, Clone, Default)]
struct KeyRange {
    lower: Option<Bound>,
    upper: Option<Bound>,
    prefix: Option<String>,
    empty: bool,
}

#[derive(Debug, Default)]
struct Rendered {
    op: Option<RangeOp>,
    excluded: Vec<String>,
    residual_prefix: Option<String>,
    empty: bool,
}

impl KeyRange {
    fn at_least(&mut self, value: String, inclusive: bool) {
        let tighter = match &self.lower {
            None => true,
            Some(b) => value > b.value || (value == b.value && !inclusive),
        };
        if tighter {
            self.lower = Some(Bound { value, inclusive });
        }
    }

    fn at_most(&mut self, value: String, inclusive: bool) {
        let tighter = match &self.upper {
            None => true,
            Some(b) => value < b.value || (value == b.value && !inclusive),
        };
        if tighter {
            self.upper = Some(Bound { value, inclusive });
        }
    }

    fn exactly(&mut self, value: String) {
        self.at_least(value.clone(), true);
        self.at_most(value, true);
    }

    fn with_prefix(&mut self, prefix: String) {
        if prefix.is_empty() {
            return;
        }
        match &self.prefix {
            None => self.prefix = Some(prefix),
            Some(current) if prefix.starts_with(current.as_str()) => self.prefix = Some(prefix),
            Some(current) if current.starts_with(prefix.as_str()) => {}
            Some(_) => self.empty = true,
        }
    }

    fn render(mut self) -> Rendered {
        if self.empty {
            return Rendered {
                empty: true,
                ..Rendered::default()
            };
        }

        let mut residual_prefix = None;
        if let Some(prefix) = self.prefix.take() {
            if self.lower.is_none() && self.upper.is_none() {
                return Rendered {
                    op: Some(RangeOp::BeginsWith(prefix)),
                    ..Rendered::default()
                };
            }
            self.at_least(prefix.clone(), true);
            if let Some(successor) = prefix_successor(&prefix) {
                self.at_most(successor, false);
            }
            residual_prefix = Some(prefix);
        }

        let mut rendered = Rendered {
            residual_prefix,
            ..Rendered::default()
        };
        rendered.op = match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => {
                if lower.value > upper.value
                    || (lower.value == upper.value && !(lower.inclusive && upper.inclusive))
                {
                    rendered.empty = true;
                    None
                } else if lower.value == upper.value {
                    Some(RangeOp::Eq(lower.value))
                } else {
                    if !lower.inclusive {
                        rendered.excluded.push(lower.value.clone());
                    }
                    if !upper.inclusive {
                        rendered.excluded.push(upper.value.clone());
                    }
                    Some(RangeOp::Between(lower.value, upper.value))
                }
            }
            (Some(lower), None) if lower.inclusive => Some(RangeOp::Ge(lower.value)),
            (Some(lower), None) => Some(RangeOp::Gt(lower.value)),
            (None, Some(upper)) if upper.inclusive => Some(RangeOp::Le(upper.value)),
            (None, Some(upper)) => Some(RangeOp::Lt(upper.value)),
            (None, None) => None,
        };
        rendered
    }
}

/// Smallest string greater than every string starting with `prefix`.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = match last {
            '\u{d7ff}' => Some('\u{e000}'),
            char::MAX => None,
            c => char::from_u32(c as u32 + 1),
        };
        if let Some(next) = next {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Record;
    use crate::query::Direction;
    use crate::schema::FieldDescriptor;

    const T: char = '\u{1f}';

    fn schema() -> EntitySchema {
        EntitySchema::builder("Widget")
            .field(FieldDescriptor::string("name"))
            .field(FieldDescriptor::integer("version"))
            .field(FieldDescriptor::string("owner"))
            .field(FieldDescriptor::string("status"))
            .field(FieldDescriptor::composite("status_version", ["status", "version"]))
            .field(FieldDescriptor::timestamp("created_at"))
            .hash_key("name")
            .range_key("version")
            .global_index("ByOwner", "owner", Some("status_version"))
            .global_index("ByStatus", "status", None)
            .local_index("ByCreated", "created_at")
            .build()
            .unwrap()
    }

    fn int(n: i64) -> String {
        format!("{:020}", (i128::from(n) + (1i128 << 63)) as u64)
    }

    fn plan(request: QueryRequest) -> Result<QueryPlan> {
        plan_query(&schema(), &Codec::new(), &request)
    }

    fn range_op(plan: &QueryPlan) -> Option<RangeOp> {
        plan.key_condition.range.as_ref().map(|r| r.op.clone())
    }

    #[test]
    fn test_hash_only_query() {
        let plan = plan(QueryRequest::primary().equals("name", "w1")).unwrap();
        assert_eq!(plan.index, None);
        assert_eq!(plan.key_condition.hash_attribute, "name");
        assert_eq!(plan.key_condition.hash_value, "w1");
        assert!(plan.key_condition.range.is_none());
        assert!(plan.scan_forward);
        assert!(!plan.empty);
    }

    #[test]
    fn test_both_cursors_rejected() {
        let result = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .starting_at(2i64)
                .starting_after(Record::new().with("name", "w1").with("version", 1i64)),
        );
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_unknown_index() {
        let result = plan(QueryRequest::on_index("Nope").equals("name", "w1"));
        assert!(matches!(result, Err(Error::UnknownIndex { index, .. }) if index == "Nope"));
    }

    #[test]
    fn test_consistent_read_on_gsi_rejected() {
        let result = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .consistent_read(true),
        );
        assert!(matches!(result, Err(Error::InconsistentReadOnGsi { index }) if index == "ByOwner"));
    }

    #[test]
    fn test_consistent_read_on_lsi_allowed() {
        let plan = plan(
            QueryRequest::on_index("ByCreated")
                .equals("name", "w1")
                .consistent_read(true),
        )
        .unwrap();
        assert!(plan.consistent_read);
        assert_eq!(plan.index.as_deref(), Some("ByCreated"));
    }

    #[test]
    fn test_missing_hash_key() {
        let result = plan(QueryRequest::primary());
        assert!(matches!(result, Err(Error::MissingHashKey { field, .. }) if field == "name"));
    }

    #[test]
    fn test_equality_on_non_key_field() {
        let result = plan(QueryRequest::primary().equals("name", "w1").equals("owner", "a"));
        assert!(matches!(result, Err(Error::InvalidPredicate { field, .. }) if field == "owner"));
    }

    #[test]
    fn test_equality_must_form_leading_run() {
        let result = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .equals("version", 2i64),
        );
        assert!(matches!(result, Err(Error::InvalidPredicate { field, .. }) if field == "version"));
    }

    #[test]
    fn test_range_predicates_on_simple_key() {
        let cases = [
            (RangePredicate::Eq(2i64.into()), RangeOp::Eq(int(2))),
            (RangePredicate::Lt(2i64.into()), RangeOp::Lt(int(2))),
            (RangePredicate::Le(2i64.into()), RangeOp::Le(int(2))),
            (RangePredicate::Gt(2i64.into()), RangeOp::Gt(int(2))),
            (RangePredicate::Ge(2i64.into()), RangeOp::Ge(int(2))),
            (
                RangePredicate::Between((-1i64).into(), 3i64.into()),
                RangeOp::Between(int(-1), int(3)),
            ),
        ];
        for (predicate, expected) in cases {
            let plan = plan(
                QueryRequest::primary()
                    .equals("name", "w1")
                    .range("version", predicate),
            )
            .unwrap();
            assert_eq!(range_op(&plan), Some(expected));
            assert!(plan.filter.excluded.is_empty());
        }
    }

    #[test]
    fn test_begins_with_requires_string_component() {
        let result = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .range("version", RangePredicate::BeginsWith("1".to_string())),
        );
        assert!(matches!(result, Err(Error::InvalidPredicate { .. })));
    }

    #[test]
    fn test_predicate_must_target_next_component() {
        let result = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .range("version", RangePredicate::Ge(1i64.into())),
        );
        assert!(matches!(result, Err(Error::InvalidPredicate { field, .. }) if field == "version"));
    }

    #[test]
    fn test_starting_at_direction() {
        let ascending = plan(QueryRequest::primary().equals("name", "w1").starting_at(2i64)).unwrap();
        assert_eq!(range_op(&ascending), Some(RangeOp::Ge(int(2))));

        let descending = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .starting_at(2i64)
                .descending(),
        )
        .unwrap();
        assert_eq!(range_op(&descending), Some(RangeOp::Le(int(2))));
        assert!(!descending.scan_forward);
    }

    #[test]
    fn test_starting_after_is_inclusive_with_skip() {
        let cursor = Record::new().with("name", "w1").with("version", 3i64);
        let plan = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .direction(Direction::Descending)
                .starting_after(cursor),
        )
        .unwrap();

        assert_eq!(range_op(&plan), Some(RangeOp::Le(int(3))));
        let skip = plan.filter.skip_first.unwrap();
        assert_eq!(skip["name"], AttributeValue::S("w1".to_string()));
        assert_eq!(skip["version"], AttributeValue::S(int(3)));
    }

    #[test]
    fn test_starting_after_hash_mismatch() {
        let cursor = Record::new().with("name", "w2").with("version", 3i64);
        let result = plan(QueryRequest::primary().equals("name", "w1").starting_after(cursor));
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_cursor_without_range_key() {
        let result = plan(
            QueryRequest::on_index("ByStatus")
                .equals("status", "active")
                .starting_at("x"),
        );
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_composite_prefix_becomes_begins_with() {
        let plan = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .equals("status", "active"),
        )
        .unwrap();
        assert_eq!(range_op(&plan), Some(RangeOp::BeginsWith(format!("active{T}"))));
    }

    #[test]
    fn test_composite_fully_bound_is_equality() {
        let plan = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .equals("status", "active")
                .equals("version", 2i64),
        )
        .unwrap();
        assert_eq!(
            range_op(&plan),
            Some(RangeOp::Eq(format!("active{T}{}{T}", int(2))))
        );
    }

    #[test]
    fn test_composite_range_within_prefix() {
        let plan = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .equals("status", "active")
                .range("version", RangePredicate::Ge(2i64.into())),
        )
        .unwrap();

        assert_eq!(
            range_op(&plan),
            Some(RangeOp::Between(
                format!("active{T}{}{T}", int(2)),
                "active ".to_string()
            ))
        );
        assert_eq!(plan.filter.excluded, vec!["active ".to_string()]);
        assert_eq!(plan.filter.range_prefix, Some(format!("active{T}")));
    }

    #[test]
    fn test_composite_gt_skips_equal_component() {
        let plan = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .range("status", RangePredicate::Gt("active".into())),
        )
        .unwrap();
        assert_eq!(range_op(&plan), Some(RangeOp::Ge("active ".to_string())));
    }

    #[test]
    fn test_composite_begins_with_on_leading_component() {
        let plan = plan(
            QueryRequest::on_index("ByOwner")
                .equals("owner", "alice")
                .range("status", RangePredicate::BeginsWith("act".to_string())),
        )
        .unwrap();
        assert_eq!(range_op(&plan), Some(RangeOp::BeginsWith("act".to_string())));
    }

    #[test]
    fn test_disjoint_predicate_and_cursor_is_empty() {
        let plan = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .range("version", RangePredicate::Lt(2i64.into()))
                .starting_at(5i64),
        )
        .unwrap();
        assert!(plan.empty);
    }

    #[test]
    fn test_predicate_and_cursor_intersect() {
        let plan = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .range("version", RangePredicate::Lt(10i64.into()))
                .starting_at(5i64),
        )
        .unwrap();
        assert_eq!(range_op(&plan), Some(RangeOp::Between(int(5), int(10))));
        assert_eq!(plan.filter.excluded, vec![int(10)]);
    }

    #[test]
    fn test_predicate_encoding_error() {
        let result = plan(
            QueryRequest::primary()
                .equals("name", "w1")
                .range("version", RangePredicate::Ge("two".into())),
        );
        assert!(matches!(result, Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_plan_scan() {
        let schema = schema();
        let scan = plan_scan(&schema, &ScanRequest::on_index("ByOwner")).unwrap();
        assert_eq!(scan.index.as_deref(), Some("ByOwner"));

        let result = plan_scan(&schema, &ScanRequest::on_index("ByOwner").consistent_read(true));
        assert!(matches!(result, Err(Error::InconsistentReadOnGsi { .. })));

        let result = plan_scan(&schema, &ScanRequest::on_index("Nope"));
        assert!(matches!(result, Err(Error::UnknownIndex { .. })));
    }

    #[test]
    fn test_result_filter() {
        let mut item = Item::new();
        item.insert("version".to_string(), AttributeValue::S(int(10)));

        let filter = ResultFilter {
            range_attribute: Some("version".to_string()),
            excluded: vec![int(10)],
            ..ResultFilter::default()
        };
        assert!(!filter.accepts(&item));

        item.insert("version".to_string(), AttributeValue::S(int(9)));
        assert!(filter.accepts(&item));
        assert!(!filter.is_cursor_item(&item));
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor("ab"), Some("ac".to_string()));
        assert_eq!(prefix_successor(&format!("a{T}")), Some("a ".to_string()));
        assert_eq!(prefix_successor(""), None);
    }
}
