//! Table provisioning (Imperative Shell).
//!
//! Plans are computed by `crate::provision`; this module applies them.

use std::time::Duration;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, CreateGlobalSecondaryIndexAction, GlobalSecondaryIndex,
    GlobalSecondaryIndexUpdate, KeySchemaElement, KeyType, LocalSecondaryIndex, Projection,
    ProjectionType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use dynamap_core::schema::{AttributeType, KeyAttributeConfig, SecondaryIndexConfig, TableConfig};

use super::client::get_table_state;
use crate::provision::{calculate_deploy_plan, DeployPlan, ProvisionError, Result};

const ACTIVATION_ATTEMPTS: u32 = 60;
const ACTIVATION_DELAY: Duration = Duration::from_secs(2);

/// Bring a table in line with its configuration and return the plan that
/// was applied.
pub async fn ensure_table(client: &Client, desired: &TableConfig) -> Result<DeployPlan> {
    let current = get_table_state(client, &desired.table_name).await?;
    let plan = calculate_deploy_plan(current.as_ref(), desired);
    execute_deploy_plan(client, &plan).await?;
    Ok(plan)
}

/// Execute a deploy plan.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    match plan {
        DeployPlan::CreateTable { config } => {
            create_table(client, config).await?;
            wait_for_table_active(client, &config.table_name).await?;
        }
        DeployPlan::AddGsis {
            table_name,
            gsis_to_add,
        } => {
            // DynamoDB accepts one index creation per UpdateTable call.
            for gsi in gsis_to_add {
                add_gsi(client, table_name, gsi).await?;
                wait_for_table_active(client, table_name).await?;
            }
        }
        DeployPlan::MissingLsis { table_name, lsis } => {
            return Err(ProvisionError::Unsupported {
                table_name: table_name.clone(),
                reason: format!(
                    "local indexes {} can only be created with the table",
                    lsis.join(", ")
                ),
            });
        }
        DeployPlan::NoChanges { .. } => {}
    }
    Ok(())
}

fn sdk_error(err: impl std::fmt::Display) -> ProvisionError {
    ProvisionError::AwsSdk(err.to_string())
}

fn to_scalar_type(attr_type: &AttributeType) -> ScalarAttributeType {
    match attr_type {
        AttributeType::String => ScalarAttributeType::S,
    }
}

fn key_schema(
    partition_key: &KeyAttributeConfig,
    sort_key: Option<&KeyAttributeConfig>,
) -> Result<Vec<KeySchemaElement>> {
    let mut elements = vec![KeySchemaElement::builder()
        .attribute_name(&partition_key.name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(sdk_error)?];

    if let Some(sk) = sort_key {
        elements.push(
            KeySchemaElement::builder()
                .attribute_name(&sk.name)
                .key_type(KeyType::Range)
                .build()
                .map_err(sdk_error)?,
        );
    }
    Ok(elements)
}

/// Add definitions for `keys` not already present.
fn define_attributes<'a>(
    definitions: &mut Vec<AttributeDefinition>,
    keys: impl IntoIterator<Item = &'a KeyAttributeConfig>,
) -> Result<()> {
    for key in keys {
        if definitions.iter().any(|a| a.attribute_name() == key.name) {
            continue;
        }
        definitions.push(
            AttributeDefinition::builder()
                .attribute_name(&key.name)
                .attribute_type(to_scalar_type(&key.attribute_type))
                .build()
                .map_err(sdk_error)?,
        );
    }
    Ok(())
}

fn index_keys(index: &SecondaryIndexConfig) -> impl Iterator<Item = &KeyAttributeConfig> {
    std::iter::once(&index.partition_key).chain(index.sort_key.as_ref())
}

fn projection_all() -> Projection {
    Projection::builder()
        .projection_type(ProjectionType::All)
        .build()
}

async fn create_table(client: &Client, config: &TableConfig) -> Result<()> {
    let mut attribute_definitions = Vec::new();
    define_attributes(
        &mut attribute_definitions,
        std::iter::once(&config.partition_key).chain(config.sort_key.as_ref()),
    )?;
    for index in config.gsis.iter().chain(config.lsis.iter()) {
        define_attributes(&mut attribute_definitions, index_keys(index))?;
    }

    let mut request = client
        .create_table()
        .table_name(&config.table_name)
        .set_key_schema(Some(key_schema(
            &config.partition_key,
            config.sort_key.as_ref(),
        )?))
        .set_attribute_definitions(Some(attribute_definitions))
        .billing_mode(BillingMode::PayPerRequest);

    for gsi in &config.gsis {
        request = request.global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(&gsi.name)
                .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
                .projection(projection_all())
                .build()
                .map_err(sdk_error)?,
        );
    }

    for lsi in &config.lsis {
        request = request.local_secondary_indexes(
            LocalSecondaryIndex::builder()
                .index_name(&lsi.name)
                .set_key_schema(Some(key_schema(&lsi.partition_key, lsi.sort_key.as_ref())?))
                .projection(projection_all())
                .build()
                .map_err(sdk_error)?,
        );
    }

    request.send().await.map_err(sdk_error)?;
    tracing::info!(table = %config.table_name, "Table created");
    Ok(())
}

async fn add_gsi(client: &Client, table_name: &str, gsi: &SecondaryIndexConfig) -> Result<()> {
    let mut attribute_definitions = Vec::new();
    define_attributes(&mut attribute_definitions, index_keys(gsi))?;

    client
        .update_table()
        .table_name(table_name)
        .set_attribute_definitions(Some(attribute_definitions))
        .global_secondary_index_updates(
            GlobalSecondaryIndexUpdate::builder()
                .create(
                    CreateGlobalSecondaryIndexAction::builder()
                        .index_name(&gsi.name)
                        .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
                        .projection(projection_all())
                        .build()
                        .map_err(sdk_error)?,
                )
                .build(),
        )
        .send()
        .await
        .map_err(sdk_error)?;

    tracing::info!(table = %table_name, index = %gsi.name, "Global index requested");
    Ok(())
}

async fn wait_for_table_active(client: &Client, table_name: &str) -> Result<()> {
    for attempt in 0..ACTIVATION_ATTEMPTS {
        if let Some(state) = get_table_state(client, table_name).await? {
            if state.is_ready() {
                return Ok(());
            }
        }
        tracing::debug!(table = %table_name, attempt, "Waiting for table to become active");
        tokio::time::sleep(ACTIVATION_DELAY).await;
    }

    Err(ProvisionError::TableActivationTimeout)
}
