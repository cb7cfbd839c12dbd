//! End-to-end behavior of the data-access layer on the in-memory backend.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use dynamap::storage::InMemoryBackend;
use dynamap::widget::{Widget, WidgetStatus, BY_CREATED, BY_OWNER};
use dynamap_core::{
    Entity, EntityTable, Error, OperationContext, QueryRequest, RangePredicate, ScanRequest,
    TableOptions,
};

type Widgets = EntityTable<Widget, InMemoryBackend>;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

async fn setup() -> (Arc<InMemoryBackend>, Widgets) {
    // Small pages so every scenario crosses page boundaries.
    let backend = Arc::new(InMemoryBackend::new().with_page_size(2));
    backend.create_table_for(&Widget::schema(), "test").await;
    let widgets = EntityTable::new(Arc::clone(&backend), TableOptions::new("test"));
    (backend, widgets)
}

fn widget(name: &str, version: i64) -> Widget {
    Widget::new(name, version, "alice").with_created_at(epoch() + Duration::minutes(version))
}

async fn seeded() -> (Arc<InMemoryBackend>, Widgets) {
    let (backend, widgets) = setup().await;
    for version in 1..=3 {
        widgets.create(&widget("w1", version)).await.unwrap();
    }
    widgets.create(&widget("w2", 1)).await.unwrap();
    (backend, widgets)
}

fn versions(items: &[Widget]) -> Vec<i64> {
    items.iter().map(|w| w.version).collect()
}

fn by_name(name: &str) -> QueryRequest {
    QueryRequest::primary().equals("name", name)
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_save_then_get_round_trips() {
    let (_, widgets) = setup().await;
    let original = widget("w1", 7).with_status(WidgetStatus::Active);

    widgets.save(&original).await.unwrap();
    let loaded = widgets.get(&Widget::key_for("w1", 7)).await.unwrap();

    assert_eq!(loaded, original);
}

#[tokio::test]
async fn test_save_overwrites() {
    let (backend, widgets) = setup().await;
    widgets.save(&widget("w1", 1)).await.unwrap();
    widgets
        .save(&widget("w1", 1).with_status(WidgetStatus::Retired))
        .await
        .unwrap();

    let loaded = widgets.get(&Widget::key_for("w1", 1)).await.unwrap();
    assert_eq!(loaded.status, WidgetStatus::Retired);
    assert_eq!(backend.item_count("test-widgets").await, 1);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let (_, widgets) = setup().await;
    let err = widgets.get(&Widget::key_for("nope", 1)).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Widget not found: name=nope,version=1");
}

#[tokio::test]
async fn test_create_twice_is_already_exists() {
    let (_, widgets) = setup().await;
    widgets.create(&widget("w1", 1)).await.unwrap();

    let err = widgets.create(&widget("w1", 1)).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
    assert_eq!(err.code(), "already_exists");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (backend, widgets) = seeded().await;
    let key = Widget::key_for("w1", 2);

    widgets.delete(&key).await.unwrap();
    widgets.delete(&key).await.unwrap();

    assert!(widgets.get(&key).await.unwrap_err().is_not_found());
    assert_eq!(backend.item_count("test-widgets").await, 3);
}

#[tokio::test]
async fn test_invalid_record_is_rejected_before_write() {
    let (backend, widgets) = setup().await;
    let err = widgets.save(&Widget::new("w1", 1, "")).await.unwrap_err();

    assert!(matches!(err, Error::InvalidRecord { ref field, .. } if field == "owner"));
    assert_eq!(backend.item_count("test-widgets").await, 0);
}

#[tokio::test]
async fn test_negative_unsigned_key_is_encoding_error() {
    let (_, widgets) = setup().await;
    let err = widgets.save(&widget("w1", -1)).await.unwrap_err();
    assert!(matches!(err, Error::Encoding { ref field, .. } if field == "version"));
}

// ============================================================================
// Query ordering and cursors
// ============================================================================

#[tokio::test]
async fn test_query_orders_by_range_key() {
    let (_, widgets) = seeded().await;

    let ascending = widgets.query_all(&by_name("w1")).await.unwrap();
    assert_eq!(versions(&ascending), vec![1, 2, 3]);

    let descending = widgets.query_all(&by_name("w1").descending()).await.unwrap();
    assert_eq!(versions(&descending), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_numeric_order_is_preserved_across_digits() {
    let (_, widgets) = setup().await;
    for version in [10, 9, 100, 2] {
        widgets.create(&widget("w1", version)).await.unwrap();
    }

    let items = widgets.query_all(&by_name("w1")).await.unwrap();
    assert_eq!(versions(&items), vec![2, 9, 10, 100]);
}

#[tokio::test]
async fn test_starting_at_is_inclusive() {
    let (_, widgets) = seeded().await;

    let items = widgets
        .query_all(&by_name("w1").starting_at(2i64))
        .await
        .unwrap();
    assert_eq!(versions(&items), vec![2, 3]);

    let items = widgets
        .query_all(&by_name("w1").descending().starting_at(2i64))
        .await
        .unwrap();
    assert_eq!(versions(&items), vec![2, 1]);
}

#[tokio::test]
async fn test_starting_after_is_exclusive() {
    let (_, widgets) = seeded().await;

    let items = widgets
        .query_all(&by_name("w1").starting_after(widget("w1", 1).to_record()))
        .await
        .unwrap();
    assert_eq!(versions(&items), vec![2, 3]);

    let items = widgets
        .query_all(
            &by_name("w1")
                .descending()
                .starting_after(widget("w1", 3).to_record()),
        )
        .await
        .unwrap();
    assert_eq!(versions(&items), vec![2, 1]);
}

#[tokio::test]
async fn test_cursors_are_mutually_exclusive() {
    let (_, widgets) = seeded().await;
    let request = by_name("w1")
        .starting_at(1i64)
        .starting_after(widget("w1", 1).to_record());

    let err = widgets.query_all(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCursor(_)));
}

#[tokio::test]
async fn test_range_predicate_and_cursor_intersect() {
    let (_, widgets) = seeded().await;
    let request = by_name("w1")
        .range("version", RangePredicate::Between(1i64.into(), 2i64.into()))
        .starting_at(2i64);

    let items = widgets.query_all(&request).await.unwrap();
    assert_eq!(versions(&items), vec![2]);
}

#[tokio::test]
async fn test_disjoint_constraints_return_nothing() {
    let (_, widgets) = seeded().await;
    let request = by_name("w1")
        .range("version", RangePredicate::Lt(2i64.into()))
        .starting_at(3i64);

    let mut pager = widgets.table().query(&request).unwrap();
    assert!(pager.next().await.unwrap().is_none());
    assert_eq!(pager.pages(), 0);
}

// ============================================================================
// Limits and last-item signaling
// ============================================================================

#[tokio::test]
async fn test_limit_one_marks_last() {
    let (_, widgets) = seeded().await;
    let mut pager = widgets.table().query(&by_name("w1").limit(1)).unwrap();

    let first = pager.next().await.unwrap().unwrap();
    assert!(first.is_last);
    assert!(pager.next().await.unwrap().is_none());
    assert_eq!(pager.delivered(), 1);
}

#[tokio::test]
async fn test_last_item_flag_across_pages() {
    let (_, widgets) = seeded().await;
    let mut flags = Vec::new();

    let summary = widgets
        .table()
        .query_each(&by_name("w1"), |_, is_last| {
            flags.push(is_last);
            true
        })
        .await
        .unwrap();

    assert_eq!(flags, vec![false, false, true]);
    assert_eq!(summary.delivered, 3);
    assert!(!summary.stopped_early);
}

#[tokio::test]
async fn test_query_each_stops_early() {
    let (_, widgets) = seeded().await;

    let summary = widgets
        .query_each(&by_name("w1"), |w, _| w.version < 2)
        .await
        .unwrap();

    assert_eq!(summary.delivered, 2);
    assert!(summary.stopped_early);
}

// ============================================================================
// Secondary indexes
// ============================================================================

#[tokio::test]
async fn test_global_index_query() {
    let (_, widgets) = seeded().await;
    widgets
        .save(&widget("w1", 2).with_status(WidgetStatus::Active))
        .await
        .unwrap();

    let request = QueryRequest::on_index(BY_OWNER)
        .equals("owner", "alice")
        .equals("status", WidgetStatus::Active);
    let items = widgets.query_all(&request).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "w1");
    assert_eq!(items[0].version, 2);
}

#[tokio::test]
async fn test_local_index_orders_by_creation() {
    let (_, widgets) = seeded().await;
    widgets
        .save(&widget("w1", 4).with_created_at(epoch() - Duration::days(1)))
        .await
        .unwrap();

    let request = QueryRequest::on_index(BY_CREATED).equals("name", "w1");
    let items = widgets.query_all(&request).await.unwrap();

    assert_eq!(versions(&items), vec![4, 1, 2, 3]);
}

#[tokio::test]
async fn test_consistent_read_on_global_index_is_rejected() {
    let (_, widgets) = seeded().await;

    let query = QueryRequest::on_index(BY_OWNER)
        .equals("owner", "alice")
        .consistent_read(true);
    let err = widgets.query_all(&query).await.unwrap_err();
    assert!(matches!(err, Error::InconsistentReadOnGsi { .. }));

    let scan = ScanRequest::on_index(BY_OWNER).consistent_read(true);
    let err = widgets.scan_all(&scan).await.unwrap_err();
    assert!(matches!(err, Error::InconsistentReadOnGsi { .. }));

    let scan = ScanRequest::on_index(BY_OWNER);
    assert_eq!(widgets.scan_all(&scan).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_query_validation_errors() {
    let (_, widgets) = seeded().await;

    let err = widgets
        .query_all(&QueryRequest::on_index(BY_OWNER))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingHashKey { ref field, .. } if field == "owner"));

    let err = widgets
        .query_all(&QueryRequest::on_index("ByColor").equals("color", "red"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownIndex { .. }));
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_scan_table() {
    let (_, widgets) = seeded().await;
    let items = widgets.scan_all(&ScanRequest::table()).await.unwrap();
    assert_eq!(items.len(), 4);

    let items = widgets.scan_all(&ScanRequest::table().limit(3)).await.unwrap();
    assert_eq!(items.len(), 3);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_context_stops_operations() {
    let (_, widgets) = seeded().await;
    let (ctx, handle) = OperationContext::with_cancellation();
    let scoped = widgets.with_context(ctx);

    assert!(scoped.get(&Widget::key_for("w1", 1)).await.is_ok());

    handle.cancel();
    let err = scoped.get(&Widget::key_for("w1", 1)).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let err = scoped.query_all(&by_name("w1")).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
