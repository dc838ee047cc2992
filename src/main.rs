use lazytag::vendors::{AnalyticsLoader, DebugOverlayLoader, MapsLoader};
use lazytag::{ChromeSession, Config, MapOptions, PageHandle};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Starting lazytag demo session");

    let session = ChromeSession::launch(false)?; // Must be false to see the overlay
    session.navigate("https://example.com").await?;

    let page: Arc<dyn PageHandle> = session.page();
    let mut config = Config::default();
    if let Ok(key) = std::env::var("MAPS_API_KEY") {
        config.maps.api_key = key;
    }

    // Analytics is best-effort: a blocked or broken tag never fails the demo.
    let analytics = AnalyticsLoader::instance(Arc::clone(&page), &config);
    analytics.track_page_view().await?;
    analytics
        .track_event("demo_started", json!({ "source": "lazytag-demo" }))
        .await?;
    info!(
        "analytics loaded: {}, loading: {}",
        analytics.is_loaded(),
        analytics.is_loading()
    );

    let overlay = DebugOverlayLoader::instance(Arc::clone(&page), &config);
    match overlay.ensure_loaded().await {
        Ok(()) => {
            overlay.show().await?;
            overlay.log("info", "lazytag demo overlay is up").await?;
            info!("debug overlay is visible");
        }
        Err(err) => error!("debug overlay failed to load: {}", err),
    }

    if config.maps.api_key.is_empty() {
        warn!("MAPS_API_KEY not set, skipping maps demo");
    } else {
        let maps = MapsLoader::instance(Arc::clone(&page), &config);
        maps.create_map(
            "body",
            &MapOptions {
                lat: 55.6761,
                lng: 12.5683,
                zoom: 12,
            },
        )
        .await?;
        info!("map created");
    }

    // Leave the page up long enough to look at the overlay.
    tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;

    info!("Demo completed successfully!");
    Ok(())
}
