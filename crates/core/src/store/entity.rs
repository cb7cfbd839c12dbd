//! Typed facade over [`Table`].

use std::marker::PhantomData;
use std::sync::Arc;

use crate::backend::Backend;
use crate::codec::Record;
use crate::context::OperationContext;
use crate::error::Result;
use crate::query::{IterationSummary, QueryRequest, ScanRequest};
use crate::schema::EntitySchema;

use super::{Key, Table, TableOptions};

/// A domain type with an explicit schema and record mapping.
pub trait Entity: Sized + Send {
    fn schema() -> Arc<EntitySchema>;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> Result<Self>;

    /// Primary key of this value.
    fn key(&self) -> Result<Key> {
        Key::of(&Self::schema(), &self.to_record())
    }
}

/// [`Table`] operations on typed entities.
pub struct EntityTable<E, B: Backend + ?Sized> {
    table: Table<B>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, B: Backend + ?Sized> Clone for EntityTable<E, B> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, B: Backend + ?Sized> EntityTable<E, B> {
    pub fn new(backend: Arc<B>, options: TableOptions) -> Self {
        Self {
            table: Table::new(backend, E::schema(), options),
            _entity: PhantomData,
        }
    }

    pub fn with_context(&self, ctx: OperationContext) -> Self {
        Self {
            table: self.table.with_context(ctx),
            _entity: PhantomData,
        }
    }

    /// The untyped table underneath.
    pub fn table(&self) -> &Table<B> {
        &self.table
    }

    pub async fn save(&self, entity: &E) -> Result<()> {
        self.table.save(&entity.to_record()).await
    }

    pub async fn create(&self, entity: &E) -> Result<()> {
        self.table.create(&entity.to_record()).await
    }

    pub async fn get(&self, key: &Key) -> Result<E> {
        E::from_record(self.table.get(key).await?)
    }

    pub async fn delete(&self, key: &Key) -> Result<()> {
        self.table.delete(key).await
    }

    /// Run a query, handing each entity and its last-item flag to `on_item`
    /// until it returns `false`. A mapping failure aborts the iteration.
    pub async fn query_each<F>(&self, request: &QueryRequest, mut on_item: F) -> Result<IterationSummary>
    where
        F: FnMut(E, bool) -> bool,
    {
        let mut pager = self.table.query(request)?;
        let mut summary = IterationSummary::default();
        while let Some(item) = pager.next().await? {
            summary.delivered += 1;
            if !on_item(E::from_record(item.record)?, item.is_last) {
                summary.stopped_early = !item.is_last;
                break;
            }
        }
        summary.pages = pager.pages();
        Ok(summary)
    }

    pub async fn query_all(&self, request: &QueryRequest) -> Result<Vec<E>> {
        self.table
            .query_all(request)
            .await?
            .into_iter()
            .map(E::from_record)
            .collect()
    }

    pub async fn scan_all(&self, request: &ScanRequest) -> Result<Vec<E>> {
        self.table
            .scan_all(request)
            .await?
            .into_iter()
            .map(E::from_record)
            .collect()
    }
}
