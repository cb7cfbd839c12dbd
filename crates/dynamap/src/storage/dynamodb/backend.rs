//! DynamoDB backend implementation.
//!
//! Implements `dynamap_core::Backend` using `aws-sdk-dynamodb`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use aws_sdk_dynamodb::Client;

use dynamap_core::backend::{
    Backend, BackendError, DeleteItemInput, GetItemInput, Page, PutCondition, PutItemInput,
    QueryInput, ScanInput,
};
use dynamap_core::Item;

use super::client::create_client;
use super::conversions::{from_sdk_item, to_sdk_item, SdkItem};
use super::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error,
    map_scan_error,
};
use crate::config::Config;

/// DynamoDB-based backend.
#[derive(Debug, Clone)]
pub struct DynamoDbBackend {
    client: Client,
}

impl DynamoDbBackend {
    /// Creates a new backend with the given DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a new backend for the configured region and endpoint.
    pub async fn from_config(config: &Config) -> Self {
        Self::new(create_client(config).await)
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn page_limit(limit: Option<u32>) -> Option<i32> {
    limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX))
}

fn into_page(items: Option<Vec<SdkItem>>, last_evaluated_key: Option<SdkItem>) -> Page {
    Page {
        items: items
            .unwrap_or_default()
            .iter()
            .map(from_sdk_item)
            .collect(),
        last_evaluated_key: last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(|key| from_sdk_item(&key)),
    }
}

fn start_key(key: Option<&Item>) -> Option<SdkItem> {
    key.map(to_sdk_item)
}

#[async_trait]
impl Backend for DynamoDbBackend {
    async fn put_item(&self, input: PutItemInput) -> Result<(), BackendError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&input.table)
            .set_item(Some(to_sdk_item(&input.item)));

        if let Some(PutCondition::AttributeNotExists(attribute)) = &input.condition {
            request = request
                .condition_expression("attribute_not_exists(#pk)")
                .expression_attribute_names("#pk", attribute);
        }

        request.send().await.map_err(map_put_item_error)?;
        Ok(())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, BackendError> {
        let result = self
            .client
            .get_item()
            .table_name(&input.table)
            .set_key(Some(to_sdk_item(&input.key)))
            .consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(map_get_item_error)?;

        Ok(result.item.as_ref().map(from_sdk_item))
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<(), BackendError> {
        self.client
            .delete_item()
            .table_name(&input.table)
            .set_key(Some(to_sdk_item(&input.key)))
            .send()
            .await
            .map_err(map_delete_item_error)?;
        Ok(())
    }

    async fn query(&self, input: QueryInput) -> Result<Page, BackendError> {
        let expression = input.key_condition.expression();
        let values: HashMap<String, SdkValue> = expression
            .values
            .into_iter()
            .map(|(placeholder, value)| (placeholder, SdkValue::S(value)))
            .collect();

        tracing::trace!(
            table = %input.table,
            index = ?input.index,
            expression = %expression.expression,
            "Query"
        );

        let result = self
            .client
            .query()
            .table_name(&input.table)
            .set_index_name(input.index)
            .key_condition_expression(expression.expression)
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(Some(values))
            .scan_index_forward(input.scan_forward)
            .consistent_read(input.consistent_read)
            .set_exclusive_start_key(start_key(input.exclusive_start_key.as_ref()))
            .set_limit(page_limit(input.limit))
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(into_page(result.items, result.last_evaluated_key))
    }

    async fn scan(&self, input: ScanInput) -> Result<Page, BackendError> {
        let result = self
            .client
            .scan()
            .table_name(&input.table)
            .set_index_name(input.index)
            .consistent_read(input.consistent_read)
            .set_exclusive_start_key(start_key(input.exclusive_start_key.as_ref()))
            .set_limit(page_limit(input.limit))
            .send()
            .await
            .map_err(map_scan_error)?;

        Ok(into_page(result.items, result.last_evaluated_key))
    }
}
