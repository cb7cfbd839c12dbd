//! Drives backend pagination through one logical iteration.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio_stream::Stream;
use tracing::{debug, trace};

use super::planner::{QueryPlan, ResultFilter, ScanPlan};
use crate::backend::{Backend, QueryInput, ScanInput};
use crate::codec::{Codec, Item, Record};
use crate::context::OperationContext;
use crate::error::{Error, Result};
use crate::schema::EntitySchema;

/// A decoded record and whether it is the last one the iteration delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedItem {
    pub record: Record,
    pub is_last: bool,
}

/// Outcome of a callback-driven iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationSummary {
    pub delivered: usize,
    pub pages: usize,
    /// The callback asked to stop before the iteration was exhausted.
    pub stopped_early: bool,
}

#[derive(Debug, Clone)]
enum Source {
    Query(QueryPlan),
    Scan(ScanPlan),
}

/// Lazy, finite, non-restartable iteration over query or scan results.
///
/// One item of look-ahead is kept so that `is_last` is correct even when
/// the backend returns a continuation token followed by an empty page.
pub struct Pager<B: Backend + ?Sized> {
    backend: Arc<B>,
    schema: Arc<EntitySchema>,
    codec: Codec,
    table: String,
    ctx: OperationContext,
    source: Source,
    filter: ResultFilter,
    page_size: Option<u32>,
    limit: Option<usize>,
    delivered: usize,
    pages: usize,
    buffer: VecDeque<Item>,
    next_key: Option<Item>,
    exhausted: bool,
    cursor_skipped: bool,
    pending: Option<Record>,
    deferred_error: Option<Error>,
    done: bool,
}

impl<B: Backend + ?Sized> Pager<B> {
    pub(crate) fn query(
        backend: Arc<B>,
        schema: Arc<EntitySchema>,
        codec: Codec,
        table: String,
        ctx: OperationContext,
        plan: QueryPlan,
        page_size: Option<u32>,
    ) -> Self {
        let exhausted = plan.empty;
        let filter = plan.filter.clone();
        let limit = plan.limit;
        Self::new(
            backend,
            schema,
            codec,
            table,
            ctx,
            Source::Query(plan),
            filter,
            page_size,
            limit,
            exhausted,
        )
    }

    pub(crate) fn scan(
        backend: Arc<B>,
        schema: Arc<EntitySchema>,
        codec: Codec,
        table: String,
        ctx: OperationContext,
        plan: ScanPlan,
        page_size: Option<u32>,
    ) -> Self {
        let limit = plan.limit;
        Self::new(
            backend,
            schema,
            codec,
            table,
            ctx,
            Source::Scan(plan),
            ResultFilter::default(),
            page_size,
            limit,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        backend: Arc<B>,
        schema: Arc<EntitySchema>,
        codec: Codec,
        table: String,
        ctx: OperationContext,
        source: Source,
        filter: ResultFilter,
        page_size: Option<u32>,
        limit: Option<usize>,
        exhausted: bool,
    ) -> Self {
        Self {
            backend,
            schema,
            codec,
            table,
            ctx,
            source,
            filter,
            page_size,
            limit,
            delivered: 0,
            pages: 0,
            buffer: VecDeque::new(),
            next_key: None,
            exhausted,
            cursor_skipped: false,
            pending: None,
            deferred_error: None,
            done: false,
        }
    }

    /// Number of items delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Number of backend pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.delivered >= limit)
    }

    /// Next record, or `None` once the iteration is over.
    ///
    /// A failure while reading ahead is reported on the call after the
    /// item in hand has been delivered. A cancelled or expired context fails
    /// the call even when the next item is already buffered.
    pub async fn next(&mut self) -> Result<Option<PagedItem>> {
        if self.done {
            return Ok(None);
        }
        if let Err(error) = self.ctx.check() {
            self.done = true;
            self.pending = None;
            self.deferred_error = None;
            return Err(error);
        }
        if let Some(error) = self.deferred_error.take() {
            self.done = true;
            return Err(error);
        }
        if self.limit_reached() {
            self.done = true;
            return Ok(None);
        }

        let record = match self.pending.take() {
            Some(record) => record,
            None => match self.fetch_next().await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(error) => {
                    self.done = true;
                    return Err(error);
                }
            },
        };
        self.delivered += 1;

        if self.limit_reached() {
            self.done = true;
            return Ok(Some(PagedItem {
                record,
                is_last: true,
            }));
        }

        let is_last = match self.fetch_next().await {
            Ok(Some(next)) => {
                self.pending = Some(next);
                false
            }
            Ok(None) => {
                self.done = true;
                true
            }
            Err(error) => {
                self.deferred_error = Some(error);
                false
            }
        };

        Ok(Some(PagedItem { record, is_last }))
    }

    /// Deliver every record to `on_item` until it returns `false`, the limit
    /// is reached or the results are exhausted.
    pub async fn for_each<F>(mut self, mut on_item: F) -> Result<IterationSummary>
    where
        F: FnMut(Record, bool) -> bool,
    {
        let mut summary = IterationSummary::default();
        while let Some(item) = self.next().await? {
            summary.delivered += 1;
            if !on_item(item.record, item.is_last) {
                summary.stopped_early = !item.is_last;
                break;
            }
        }
        summary.pages = self.pages;
        Ok(summary)
    }

    /// Collect every remaining record.
    pub async fn collect_all(mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(item) = self.next().await? {
            records.push(item.record);
        }
        Ok(records)
    }

    /// Turn the pager into a stream of `(record, is_last)` items.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<PagedItem>> {
        async_stream::try_stream! {
            while let Some(item) = self.next().await? {
                yield item;
            }
        }
    }

    /// Decode the next buffered item that passes the filters, fetching pages
    /// as needed.
    async fn fetch_next(&mut self) -> Result<Option<Record>> {
        loop {
            while let Some(item) = self.buffer.pop_front() {
                if !self.cursor_skipped && self.filter.is_cursor_item(&item) {
                    self.cursor_skipped = true;
                    trace!(table = %self.table, "Dropped cursor item");
                    continue;
                }
                if !self.filter.accepts(&item) {
                    continue;
                }
                return Ok(Some(self.codec.decode_item(&self.schema, &item)?));
            }

            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> Result<()> {
        self.ctx.check()?;

        let exclusive_start_key = self.next_key.take();
        let page = match &self.source {
            Source::Query(plan) => {
                self.backend
                    .query(QueryInput {
                        table: self.table.clone(),
                        index: plan.index.clone(),
                        key_condition: plan.key_condition.clone(),
                        scan_forward: plan.scan_forward,
                        consistent_read: plan.consistent_read,
                        exclusive_start_key,
                        limit: self.page_size,
                    })
                    .await?
            }
            Source::Scan(plan) => {
                self.backend
                    .scan(ScanInput {
                        table: self.table.clone(),
                        index: plan.index.clone(),
                        consistent_read: plan.consistent_read,
                        exclusive_start_key,
                        limit: self.page_size,
                    })
                    .await?
            }
        };

        self.ctx.check()?;
        self.pages += 1;
        self.exhausted = page.last_evaluated_key.is_none();
        self.next_key = page.last_evaluated_key;

        debug!(
            table = %self.table,
            page = self.pages,
            items = page.items.len(),
            has_more = !self.exhausted,
            "Fetched page"
        );

        self.buffer.extend(page.items);
        Ok(())
    }
}
