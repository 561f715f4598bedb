use super::*;
use chrono::{Duration, Utc};
use std::time::Instant;
use vineyard::CatalogStore;

#[tokio::test]
async fn test_scenario_family_discovery_failure() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    Mock::given(method("GET"))
        .and(path(recommendation_path("B0BROKEN")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.server)
        .await;

    let before = Utc::now();
    app.orchestrator.visit_page(vec![descriptor("B0BROKEN", true)]).await?;
    app.orchestrator.queue().wait_until_idle().await;

    let item = app.catalog_item("B0BROKEN").await?;
    assert!(item.variants.is_empty());
    assert!(item.last_scan_date.expect("scan date set") >= before);

    // Still rendered, with the "Not Scanned" price
    let renders = app.renderer.full_renders_of("B0BROKEN");
    assert_eq!(renders.len(), 1);
    assert_eq!(vineyard::render::PriceLabel::for_item(&renders[0]).to_string(), "Not Scanned");

    Ok(())
}

#[tokio::test]
async fn test_error_payload_leaves_variant_partial() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    mount_variations(&app.server, "B0FAMILY", &["B0RED", "B0BLUE"], 1).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/item/B0RED", recommendation_path("B0FAMILY"))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "ITEM_NOT_IN_ENROLLMENT",
            "result": null
        })))
        .expect(1)
        .mount(&app.server)
        .await;
    mount_detail(&app.server, "B0FAMILY", "B0BLUE", 12.0, 1).await;

    app.orchestrator.visit_page(vec![descriptor("B0FAMILY", true)]).await?;
    app.orchestrator.queue().wait_until_idle().await;

    let item = app.catalog_item("B0FAMILY").await?;
    assert_eq!(item.variants.len(), 2);
    assert_eq!(item.variants["B0RED"].dimensions, Some(json!({"size": "B0RED"})));
    assert_eq!(item.variants["B0RED"].tax_value, None);
    assert_eq!(item.variants["B0BLUE"].tax_value, Some(12.0));

    Ok(())
}

#[tokio::test]
async fn test_scans_are_spaced_by_cooldown() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    for key in ["B0ONE", "B0TWO", "B0THREE"] {
        mount_detail(&app.server, key, key, 5.0, 1).await;
    }

    let started = Instant::now();
    app.orchestrator
        .visit_page(vec![
            descriptor("B0ONE", false),
            descriptor("B0TWO", false),
            descriptor("B0THREE", false),
        ])
        .await?;
    app.orchestrator.queue().wait_until_idle().await;

    // Three cooldowns of 20ms each, never overlapping
    assert!(started.elapsed() >= std::time::Duration::from_millis(60));

    let completed: Vec<String> = app
        .renderer
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Rendered::Full(item) => Some(item.item_key),
            Rendered::Loading(_) => None,
        })
        .collect();
    assert_eq!(completed, vec!["B0ONE", "B0TWO", "B0THREE"]);

    Ok(())
}

#[tokio::test]
async fn test_stale_item_is_rescanned() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    mount_detail(&app.server, "B0STALE", "B0STALE", 3.5, 1).await;
    mount_detail(&app.server, "B0FRESH", "B0FRESH", 3.5, 0).await;

    app.orchestrator
        .reconcile(descriptor("B0STALE", false))
        .await?;
    app.orchestrator
        .reconcile(descriptor("B0FRESH", false))
        .await?;

    let mut stale = app.catalog_item("B0STALE").await?;
    stale.last_scan_date = Some(Utc::now() - Duration::days(15));
    app.catalog.upsert(&stale).await?;

    let mut fresh = app.catalog_item("B0FRESH").await?;
    fresh.last_scan_date = Some(Utc::now() - Duration::days(13));
    app.catalog.upsert(&fresh).await?;

    let summary = app
        .orchestrator
        .visit_page(vec![descriptor("B0STALE", false), descriptor("B0FRESH", false)])
        .await?;
    assert_eq!(summary.queued, 1);
    assert_eq!(summary.rendered_cached, 1);

    app.orchestrator.queue().wait_until_idle().await;
    let rescanned = app.catalog_item("B0STALE").await?;
    assert_eq!(rescanned.variants["B0STALE"].tax_value, Some(3.5));

    Ok(())
}

#[tokio::test]
async fn test_new_session_id_is_used_for_scan() -> anyhow::Result<()> {
    let app = create_test_app().await?;
    app.orchestrator.reconcile(descriptor("B0MOVED", false)).await?;

    let mut moved = descriptor("B0MOVED", false);
    moved.session_recommendation_id = "A1F83G8C2ARO7P#B0MOVED".to_string();
    Mock::given(method("GET"))
        .and(path("/vine/api/recommendations/A1F83G8C2ARO7P%23B0MOVED/item/B0MOVED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"taxValue": 42.0, "taxCurrency": "GBP"}
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    app.orchestrator.visit_page(vec![moved]).await?;
    app.orchestrator.queue().wait_until_idle().await;

    let item = app.catalog_item("B0MOVED").await?;
    assert_eq!(item.session_recommendation_id, "A1F83G8C2ARO7P#B0MOVED");
    assert_eq!(item.variants["B0MOVED"].tax_currency.as_deref(), Some("GBP"));

    Ok(())
}
