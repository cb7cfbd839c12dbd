//! Query planning and pagination.

mod condition;
mod pager;
mod planner;
mod types;

pub use condition::{KeyCondition, KeyExpression, RangeKeyCondition, RangeOp};
pub use pager::{IterationSummary, PagedItem, Pager};
pub use planner::{plan_query, plan_scan, QueryPlan, ResultFilter, ScanPlan};
pub use types::{Cursor, Direction, QueryRequest, RangePredicate, ScanRequest};
