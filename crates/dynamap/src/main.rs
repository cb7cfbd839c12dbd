use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynamap::provision::{calculate_deploy_plan, format_deploy_plan};
use dynamap::storage::InMemoryBackend;
use dynamap::widget::{Widget, WidgetStatus, BY_OWNER};
use dynamap::Config;
use dynamap_core::{Entity, EntityTable, QueryRequest, TableConfig};

/// dynamap - Typed access to DynamoDB tables
#[derive(Parser, Debug)]
#[command(name = "dynamap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Table name prefix
    #[arg(long, global = true, env = "DYNAMAP_TABLE_PREFIX")]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the table layout derived from the widget schema
    Describe,

    /// Run the widget walkthrough against the in-memory backend
    Demo {
        /// Widget versions to create
        #[arg(long, default_value = "5")]
        versions: i64,
    },

    /// Create or update the widget table in DynamoDB
    #[cfg(feature = "dynamodb")]
    Deploy {
        /// Only print the plan
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamap=debug,dynamap_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(prefix) = cli.prefix {
        config.table_prefix = prefix;
    }

    match cli.command {
        Commands::Describe => describe(&config),
        Commands::Demo { versions } => demo(&config, versions).await,
        #[cfg(feature = "dynamodb")]
        Commands::Deploy { dry_run } => deploy(&config, dry_run).await,
    }
}

fn describe(config: &Config) -> Result<()> {
    let desired = TableConfig::from_schema(&Widget::schema(), &config.table_prefix);
    for line in format_deploy_plan(&calculate_deploy_plan(None, &desired)) {
        println!("{line}");
    }
    Ok(())
}

async fn demo(config: &Config, versions: i64) -> Result<()> {
    let backend = Arc::new(InMemoryBackend::new().with_page_size(config.page_size as usize));
    backend
        .create_table_for(&Widget::schema(), &config.table_prefix)
        .await;
    let widgets: EntityTable<Widget, InMemoryBackend> =
        EntityTable::new(Arc::clone(&backend), config.table_options());

    let start = Utc::now();
    for version in 1..=versions {
        let status = if version == versions {
            WidgetStatus::Active
        } else {
            WidgetStatus::Retired
        };
        let widget = Widget::new("gizmo", version, "alice")
            .with_status(status)
            .with_created_at(start + Duration::minutes(version));
        widgets.create(&widget).await?;
    }
    tracing::info!(versions, "Widgets created");

    // Newest first, paging through the stream.
    let request = QueryRequest::primary()
        .equals("name", "gizmo")
        .descending()
        .consistent_read(config.consistent_read);
    let stream = widgets.table().query(&request)?.into_stream();
    tokio::pin!(stream);
    while let Some(item) = stream.next().await {
        let item = item?;
        let widget = Widget::from_record(item.record)?;
        println!("{}", serde_json::to_string(&widget)?);
    }

    // Active widgets of one owner, through the global index.
    let request = QueryRequest::on_index(BY_OWNER)
        .equals("owner", "alice")
        .equals("status", WidgetStatus::Active);
    for widget in widgets.query_all(&request).await? {
        println!("{}", serde_json::to_string(&widget)?);
    }

    Ok(())
}

#[cfg(feature = "dynamodb")]
async fn deploy(config: &Config, dry_run: bool) -> Result<()> {
    use dynamap::storage::dynamodb::{create_client, ensure_table, get_table_state};

    println!("Target: {}", config.target_display());
    let desired = TableConfig::from_schema(&Widget::schema(), &config.table_prefix);
    let client = create_client(config).await;

    if dry_run {
        let current = get_table_state(&client, &desired.table_name).await?;
        for line in format_deploy_plan(&calculate_deploy_plan(current.as_ref(), &desired)) {
            println!("{line}");
        }
        return Ok(());
    }

    let plan = ensure_table(&client, &desired).await?;
    for line in format_deploy_plan(&plan) {
        println!("{line}");
    }
    Ok(())
}
