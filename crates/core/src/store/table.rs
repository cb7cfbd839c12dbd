//! Save/Create/Get/Delete and Query/Scan entry points for one entity.

use std::sync::Arc;

use super::key::{describe_record, Key};
use crate::backend::{
    Backend, BackendError, DeleteItemInput, GetItemInput, PutCondition, PutItemInput,
};
use crate::codec::{Codec, Record};
use crate::context::OperationContext;
use crate::error::{Error, Result};
use crate::query::{plan_query, plan_scan, IterationSummary, Pager, QueryRequest, ScanRequest};
use crate::schema::EntitySchema;

/// Options applied when binding a schema to a backend.
#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    /// Table name prefix, usually the environment (`prod`, `dev`).
    pub prefix: String,
    pub codec: Codec,
    /// Items requested per backend page; `None` leaves it to the backend.
    pub page_size: Option<u32>,
}

impl TableOptions {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// An entity schema bound to a backend table.
///
/// Cheap to clone; holds no mutable state.
pub struct Table<B: Backend + ?Sized> {
    backend: Arc<B>,
    schema: Arc<EntitySchema>,
    codec: Codec,
    table_name: String,
    page_size: Option<u32>,
    ctx: OperationContext,
}

impl<B: Backend + ?Sized> Clone for Table<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            schema: Arc::clone(&self.schema),
            codec: self.codec,
            table_name: self.table_name.clone(),
            page_size: self.page_size,
            ctx: self.ctx.clone(),
        }
    }
}

impl<B: Backend + ?Sized> Table<B> {
    pub fn new(backend: Arc<B>, schema: Arc<EntitySchema>, options: TableOptions) -> Self {
        let table_name = schema.table_name(&options.prefix);
        Self {
            backend,
            schema,
            codec: options.codec,
            table_name,
            page_size: options.page_size,
            ctx: OperationContext::background(),
        }
    }

    /// A handle whose operations observe `ctx` for cancellation and deadlines.
    pub fn with_context(&self, ctx: OperationContext) -> Self {
        Self {
            ctx,
            ..self.clone()
        }
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Unconditional put (upsert).
    pub async fn save(&self, record: &Record) -> Result<()> {
        let item = self.codec.encode_item(&self.schema, record)?;
        self.ctx.check()?;
        self.backend
            .put_item(PutItemInput {
                table: self.table_name.clone(),
                item,
                condition: None,
            })
            .await?;
        self.ctx.check()?;

        tracing::debug!(
            table = %self.table_name,
            key = %describe_record(&self.schema, record),
            "Item saved"
        );
        Ok(())
    }

    /// Put that fails with `AlreadyExists` when an item with the same
    /// primary key is stored.
    pub async fn create(&self, record: &Record) -> Result<()> {
        let item = self.codec.encode_item(&self.schema, record)?;
        let hash_attribute = self.schema.primary_index().hash_key.name.clone();

        self.ctx.check()?;
        let result = self
            .backend
            .put_item(PutItemInput {
                table: self.table_name.clone(),
                item,
                condition: Some(PutCondition::AttributeNotExists(hash_attribute)),
            })
            .await;

        match result {
            Ok(()) => {}
            Err(BackendError::ConditionFailed) => {
                let key = describe_record(&self.schema, record);
                tracing::debug!(table = %self.table_name, %key, "Item already exists");
                return Err(Error::AlreadyExists {
                    schema: self.schema.name().to_string(),
                    key,
                });
            }
            Err(err) => return Err(err.into()),
        }
        self.ctx.check()?;

        tracing::debug!(
            table = %self.table_name,
            key = %describe_record(&self.schema, record),
            "Item created"
        );
        Ok(())
    }

    /// Strongly consistent read on the primary key.
    pub async fn get(&self, key: &Key) -> Result<Record> {
        let key_item = self
            .codec
            .primary_key(&self.schema, &key.to_record(&self.schema)?)?;

        self.ctx.check()?;
        let item = self
            .backend
            .get_item(GetItemInput {
                table: self.table_name.clone(),
                key: key_item,
                consistent_read: true,
            })
            .await?;
        self.ctx.check()?;

        match item {
            Some(item) => {
                tracing::trace!(table = %self.table_name, key = %key.describe(&self.schema), "Item found");
                Ok(self.codec.decode_item(&self.schema, &item)?)
            }
            None => Err(Error::NotFound {
                schema: self.schema.name().to_string(),
                key: key.describe(&self.schema),
            }),
        }
    }

    /// Delete by primary key. Deleting an absent item succeeds.
    pub async fn delete(&self, key: &Key) -> Result<()> {
        let key_item = self
            .codec
            .primary_key(&self.schema, &key.to_record(&self.schema)?)?;

        self.ctx.check()?;
        self.backend
            .delete_item(DeleteItemInput {
                table: self.table_name.clone(),
                key: key_item,
            })
            .await?;
        self.ctx.check()?;

        tracing::debug!(table = %self.table_name, key = %key.describe(&self.schema), "Item deleted");
        Ok(())
    }

    /// Plan a query and return the pager that runs it.
    ///
    /// Validation errors are reported here, before any backend call.
    pub fn query(&self, request: &QueryRequest) -> Result<Pager<B>> {
        let plan = plan_query(&self.schema, &self.codec, request)?;
        Ok(Pager::query(
            Arc::clone(&self.backend),
            Arc::clone(&self.schema),
            self.codec,
            self.table_name.clone(),
            self.ctx.clone(),
            plan,
            self.page_size,
        ))
    }

    /// Plan a scan and return the pager that runs it.
    pub fn scan(&self, request: &ScanRequest) -> Result<Pager<B>> {
        let plan = plan_scan(&self.schema, request)?;
        Ok(Pager::scan(
            Arc::clone(&self.backend),
            Arc::clone(&self.schema),
            self.codec,
            self.table_name.clone(),
            self.ctx.clone(),
            plan,
            self.page_size,
        ))
    }

    /// Run a query, handing each record and its last-item flag to `on_item`
    /// until it returns `false`.
    pub async fn query_each<F>(&self, request: &QueryRequest, on_item: F) -> Result<IterationSummary>
    where
        F: FnMut(Record, bool) -> bool,
    {
        self.query(request)?.for_each(on_item).await
    }

    pub async fn query_all(&self, request: &QueryRequest) -> Result<Vec<Record>> {
        self.query(request)?.collect_all().await
    }

    pub async fn scan_all(&self, request: &ScanRequest) -> Result<Vec<Record>> {
        self.scan(request)?.collect_all().await
    }
}
