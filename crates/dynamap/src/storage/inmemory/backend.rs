//! In-memory backend implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dynamap_core::backend::{
    Backend, BackendError, DeleteItemInput, GetItemInput, Page, PutCondition, PutItemInput,
    QueryInput, ScanInput,
};
use dynamap_core::schema::TableConfig;
use dynamap_core::{AttributeValue, EntitySchema, Item};

/// Items returned per page when a request sets no limit.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// In-memory storage backend for testing.
///
/// Follows DynamoDB semantics for conditional puts, range key ordering,
/// sparse indexes and `LastEvaluatedKey`: a page that fills its limit
/// always carries a continuation key, even when nothing follows it.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<HashMap<String, MemTable>>>,
    page_size: usize,
}

#[derive(Debug)]
struct MemTable {
    config: TableConfig,
    /// Keyed by (hash, range); range is empty for hash-only tables.
    items: BTreeMap<(String, String), Item>,
}

/// Key attribute names of the table or one of its indexes.
#[derive(Debug, Clone)]
struct IndexKeys {
    hash: String,
    range: Option<String>,
    global: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates a new backend with no tables.
    pub fn new() -> Self {
        Self::with_tables(Vec::new())
    }

    /// Creates a backend with the given tables already registered.
    pub fn with_tables(configs: impl IntoIterator<Item = TableConfig>) -> Self {
        let tables = configs
            .into_iter()
            .map(|config| {
                (
                    config.table_name.clone(),
                    MemTable {
                        config,
                        items: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self {
            tables: Arc::new(RwLock::new(tables)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Maximum items per page, applied on top of each request's limit.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a table. Registering an existing table leaves its items.
    pub async fn create_table(&self, config: TableConfig) {
        let mut tables = self.tables.write().await;
        tables
            .entry(config.table_name.clone())
            .or_insert_with(|| MemTable {
                config,
                items: BTreeMap::new(),
            });
    }

    /// Register the table derived from an entity schema.
    pub async fn create_table_for(&self, schema: &EntitySchema, prefix: &str) {
        self.create_table(TableConfig::from_schema(schema, prefix))
            .await;
    }

    /// Number of items stored in a table.
    pub async fn item_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map_or(0, |t| t.items.len())
    }
}

impl MemTable {
    fn primary_keys(&self) -> IndexKeys {
        IndexKeys {
            hash: self.config.partition_key.name.clone(),
            range: self.config.sort_key.as_ref().map(|k| k.name.clone()),
            global: false,
        }
    }

    fn index_keys(&self, operation: &'static str, index: Option<&str>) -> Result<IndexKeys, BackendError> {
        let Some(name) = index else {
            return Ok(self.primary_keys());
        };
        let config = self.config.index(name).ok_or_else(|| {
            BackendError::other(
                operation,
                format!(
                    "ValidationException: table {} has no index {name}",
                    self.config.table_name
                ),
            )
        })?;
        Ok(IndexKeys {
            hash: config.partition_key.name.clone(),
            range: config.sort_key.as_ref().map(|k| k.name.clone()),
            global: self.config.is_gsi(name),
        })
    }

    fn storage_key(&self, operation: &'static str, item: &Item) -> Result<(String, String), BackendError> {
        let keys = self.primary_keys();
        let hash = string_attr(item, &keys.hash).ok_or_else(|| missing_key(operation, &keys.hash))?;
        let range = match &keys.range {
            Some(name) => string_attr(item, name).ok_or_else(|| missing_key(operation, name))?,
            None => "",
        };
        Ok((hash.to_string(), range.to_string()))
    }

    /// Sort position of an item within an index: index key, then primary key.
    fn position(&self, keys: &IndexKeys, item: &Item) -> Vec<String> {
        let primary = self.primary_keys();
        [
            Some(&keys.hash),
            keys.range.as_ref(),
            Some(&primary.hash),
            primary.range.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|name| string_attr(item, name).unwrap_or_default().to_string())
        .collect()
    }

    /// Key attributes returned as `LastEvaluatedKey`.
    fn continuation_key(&self, keys: &IndexKeys, item: &Item) -> Item {
        let primary = self.primary_keys();
        [
            Some(&keys.hash),
            keys.range.as_ref(),
            Some(&primary.hash),
            primary.range.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
    }

    /// Items present in the index (sparse indexes skip items without keys),
    /// in ascending index order.
    fn index_items(&self, keys: &IndexKeys) -> Vec<(Vec<String>, &Item)> {
        let mut items: Vec<(Vec<String>, &Item)> = self
            .items
            .values()
            .filter(|item| {
                string_attr(item, &keys.hash).is_some()
                    && keys.range.as_ref().is_none_or(|r| string_attr(item, r).is_some())
            })
            .map(|item| (self.position(keys, item), item))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(AttributeValue::as_s)
}

fn missing_key(operation: &'static str, attribute: &str) -> BackendError {
    BackendError::other(
        operation,
        format!("ValidationException: missing key attribute {attribute}"),
    )
}

fn table_not_found(operation: &'static str, table: &str) -> BackendError {
    BackendError::other(
        operation,
        format!("ResourceNotFoundException: table {table} not found"),
    )
}

impl InMemoryBackend {
    /// Cut one page out of ordered index items.
    fn paginate(
        &self,
        table: &MemTable,
        keys: &IndexKeys,
        ordered: Vec<(Vec<String>, &Item)>,
        forward: bool,
        exclusive_start_key: Option<&Item>,
        limit: Option<u32>,
    ) -> Page {
        let start = exclusive_start_key.map(|key| table.position(keys, key));
        let page_limit = limit
            .map_or(self.page_size, |l| l as usize)
            .min(self.page_size);

        let mut ordered = ordered;
        if !forward {
            ordered.reverse();
        }

        let items: Vec<Item> = ordered
            .into_iter()
            .filter(|(position, _)| match &start {
                None => true,
                Some(start) if forward => position > start,
                Some(start) => position < start,
            })
            .take(page_limit)
            .map(|(_, item)| item.clone())
            .collect();

        let last_evaluated_key = if page_limit > 0 && items.len() == page_limit {
            items.last().map(|item| table.continuation_key(keys, item))
        } else {
            None
        };

        Page {
            items,
            last_evaluated_key,
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn put_item(&self, input: PutItemInput) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&input.table)
            .ok_or_else(|| table_not_found("PutItem", &input.table))?;

        let key = table.storage_key("PutItem", &input.item)?;
        if let Some(PutCondition::AttributeNotExists(attribute)) = &input.condition {
            let exists = table
                .items
                .get(&key)
                .is_some_and(|existing| existing.contains_key(attribute));
            if exists {
                tracing::trace!(table = %input.table, "Conditional put rejected");
                return Err(BackendError::ConditionFailed);
            }
        }

        table.items.insert(key, input.item);
        Ok(())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, BackendError> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&input.table)
            .ok_or_else(|| table_not_found("GetItem", &input.table))?;

        let key = table.storage_key("GetItem", &input.key)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&input.table)
            .ok_or_else(|| table_not_found("DeleteItem", &input.table))?;

        let key = table.storage_key("DeleteItem", &input.key)?;
        table.items.remove(&key);
        Ok(())
    }

    async fn query(&self, input: QueryInput) -> Result<Page, BackendError> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&input.table)
            .ok_or_else(|| table_not_found("Query", &input.table))?;

        let keys = table.index_keys("Query", input.index.as_deref())?;
        if keys.global && input.consistent_read {
            return Err(BackendError::other(
                "Query",
                "ValidationException: consistent reads are not supported on global secondary indexes",
            ));
        }
        if input.key_condition.hash_attribute != keys.hash {
            return Err(BackendError::other(
                "Query",
                format!(
                    "ValidationException: key condition uses {}, index hash key is {}",
                    input.key_condition.hash_attribute, keys.hash
                ),
            ));
        }
        if let Some(range) = &input.key_condition.range {
            if keys.range.as_deref() != Some(range.attribute.as_str()) {
                return Err(BackendError::other(
                    "Query",
                    format!(
                        "ValidationException: {} is not the range key of the index",
                        range.attribute
                    ),
                ));
            }
        }

        let matching: Vec<(Vec<String>, &Item)> = table
            .index_items(&keys)
            .into_iter()
            .filter(|(_, item)| input.key_condition.matches(item))
            .collect();
        let page = self.paginate(
            table,
            &keys,
            matching,
            input.scan_forward,
            input.exclusive_start_key.as_ref(),
            input.limit,
        );

        tracing::trace!(
            table = %input.table,
            index = ?input.index,
            items = page.items.len(),
            has_more = page.last_evaluated_key.is_some(),
            "Query page"
        );
        Ok(page)
    }

    async fn scan(&self, input: ScanInput) -> Result<Page, BackendError> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&input.table)
            .ok_or_else(|| table_not_found("Scan", &input.table))?;

        let keys = table.index_keys("Scan", input.index.as_deref())?;
        if keys.global && input.consistent_read {
            return Err(BackendError::other(
                "Scan",
                "ValidationException: consistent reads are not supported on global secondary indexes",
            ));
        }

        let items = table.index_items(&keys);
        Ok(self.paginate(
            table,
            &keys,
            items,
            true,
            input.exclusive_start_key.as_ref(),
            input.limit,
        ))
    }
}
