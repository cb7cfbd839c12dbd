//! Pure functions for calculating table provisioning plans (Functional Core).
//!
//! The imperative side lives in `storage::dynamodb::deploy` and only runs
//! with the `dynamodb` feature.

use dynamap_core::schema::{SecondaryIndexConfig, TableConfig};
use thiserror::Error;

/// Result type alias for provisioning.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that can occur while provisioning tables.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Table '{table_name}' cannot be updated: {reason}")]
    Unsupported { table_name: String, reason: String },

    #[error("Timeout waiting for table to become active")]
    TableActivationTimeout,
}

/// Represents the current state of a table.
#[derive(Debug, Clone)]
pub struct TableState {
    pub status: TableStatus,
    pub gsis: Vec<IndexState>,
    pub lsis: Vec<String>,
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

/// GSI state.
#[derive(Debug, Clone)]
pub struct IndexState {
    pub name: String,
    pub status: IndexStatus,
}

/// GSI status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

impl TableState {
    /// Table and every GSI are active.
    pub fn is_ready(&self) -> bool {
        self.status == TableStatus::Active
            && self.gsis.iter().all(|g| g.status == IndexStatus::Active)
    }
}

/// Planned changes for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Table doesn't exist, needs to be created.
    CreateTable { config: TableConfig },
    /// Table exists, GSIs need to be added.
    AddGsis {
        table_name: String,
        gsis_to_add: Vec<SecondaryIndexConfig>,
    },
    /// Table exists but lacks local indexes, which can only be created
    /// together with the table.
    MissingLsis {
        table_name: String,
        lsis: Vec<String>,
    },
    /// Table is up to date, no changes needed.
    NoChanges { table_name: String },
}

/// Pure function: Calculate what changes are needed to reach desired state.
pub fn calculate_deploy_plan(current: Option<&TableState>, desired: &TableConfig) -> DeployPlan {
    let Some(state) = current else {
        return DeployPlan::CreateTable {
            config: desired.clone(),
        };
    };

    let missing_lsis: Vec<String> = desired
        .lsis
        .iter()
        .filter(|lsi| !state.lsis.contains(&lsi.name))
        .map(|lsi| lsi.name.clone())
        .collect();
    if !missing_lsis.is_empty() {
        return DeployPlan::MissingLsis {
            table_name: desired.table_name.clone(),
            lsis: missing_lsis,
        };
    }

    // Find GSIs that exist in desired but not in current
    let existing_gsi_names: Vec<&str> = state.gsis.iter().map(|g| g.name.as_str()).collect();
    let gsis_to_add: Vec<SecondaryIndexConfig> = desired
        .gsis
        .iter()
        .filter(|gsi| !existing_gsi_names.contains(&gsi.name.as_str()))
        .cloned()
        .collect();

    if gsis_to_add.is_empty() {
        DeployPlan::NoChanges {
            table_name: desired.table_name.clone(),
        }
    } else {
        DeployPlan::AddGsis {
            table_name: desired.table_name.clone(),
            gsis_to_add,
        }
    }
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    match plan {
        DeployPlan::CreateTable { config } => {
            let mut lines = vec![
                format!("+ Create table: {}", config.table_name),
                format!("  Partition key: {} (S)", config.partition_key.name),
            ];
            if let Some(sk) = &config.sort_key {
                lines.push(format!("  Sort key: {} (S)", sk.name));
            }
            for gsi in &config.gsis {
                lines.push(format!("  + GSI: {}", gsi.name));
                lines.extend(format_index_keys(gsi));
            }
            for lsi in &config.lsis {
                lines.push(format!("  + LSI: {}", lsi.name));
                lines.extend(format_index_keys(lsi));
            }
            lines.push("  Billing: PAY_PER_REQUEST".to_string());
            lines
        }
        DeployPlan::AddGsis {
            table_name,
            gsis_to_add,
        } => {
            let mut lines = vec![format!("~ Update table: {table_name}")];
            for gsi in gsis_to_add {
                lines.push(format!("  + Add GSI: {}", gsi.name));
            }
            lines
        }
        DeployPlan::MissingLsis { table_name, lsis } => {
            let mut lines = vec![format!(
                "! Table '{table_name}' must be recreated to add local indexes"
            )];
            for lsi in lsis {
                lines.push(format!("  ! Missing LSI: {lsi}"));
            }
            lines
        }
        DeployPlan::NoChanges { table_name } => {
            vec![format!("= Table '{table_name}' is up to date")]
        }
    }
}

fn format_index_keys(index: &SecondaryIndexConfig) -> Vec<String> {
    let mut lines = vec![format!("    Partition key: {} (S)", index.partition_key.name)];
    if let Some(sk) = &index.sort_key {
        lines.push(format!("    Sort key: {} (S)", sk.name));
    }
    lines
}
