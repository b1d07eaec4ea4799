use lume_feed::config::Settings;
use lume_feed::services::{
    AppwritePictureResolver, CachingPictureResolver, Collaborators, MockSwipeService,
    PictureResolver,
};
use lume_feed::{FeedMachine, FeedStats};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Profile the demo swipe service answers with a mutual like
const DEMO_MUTUAL_LIKE: &str = "8";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging, RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Lume feed demo...");

    let mut pictures: Arc<dyn PictureResolver> = match &settings.appwrite {
        Some(appwrite) => {
            info!("Resolving pictures from Appwrite bucket {}", appwrite.bucket_id);
            Arc::new(AppwritePictureResolver::new(appwrite.storage(), appwrite.timeout_secs)?)
        }
        None => {
            info!("Resolving pictures from the demo set");
            Collaborators::demo().pictures
        }
    };

    if settings.cache.enabled {
        info!(
            "Picture cache enabled (size: {} entries, TTL: {}s)",
            settings.cache.l1_cache_size, settings.cache.ttl_secs
        );
        pictures = Arc::new(CachingPictureResolver::new(
            pictures,
            settings.cache.l1_cache_size,
            settings.cache.ttl_secs,
        ));
    }

    let collaborators = Collaborators {
        pictures,
        swipes: Arc::new(MockSwipeService::new().with_mutual_like(DEMO_MUTUAL_LIKE)),
        ..Collaborators::demo()
    };

    let options = settings.feed.options();
    info!("Feed options: {:?}", options);

    let machine = FeedMachine::new(collaborators, options);

    let mut updates = machine.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let stats = FeedStats::of(&updates.borrow_and_update());
            debug!(
                "Feed updated: {} cards, {} pictures pending, {} resolved",
                stats.cards, stats.pending_slots, stats.resolved_slots
            );
        }
    });

    machine.load_feed().await;
    machine.settle().await;

    let stats = machine.stats();
    info!(
        "Feed ready: {} cards, {} pictures resolved, {} pending",
        stats.cards, stats.resolved_slots, stats.pending_slots
    );

    // Swipe through the stack: like every other card, pass the rest
    let mut position = 0;
    while let Some(card) = machine.state().content.cards().and_then(|cards| cards.last().cloned()) {
        let is_like = position % 2 == 0;
        position += 1;

        match machine.decide(&card, is_like).await {
            Ok(Some(new_match)) => {
                info!("It's a match with {}!", card.profile.name);
                if let Err(e) = machine.send_message(&new_match.id, "Hi there!").await {
                    warn!("Could not greet {}: {}", card.profile.name, e);
                }
                machine.close_dialog();
            }
            Ok(None) => {}
            Err(e) => error!("Swipe on {} failed: {}", card.profile.name, e),
        }

        machine.dismiss_top_card();
    }

    info!("Stack exhausted after {} swipes", position);
    println!("{}", serde_json::to_string_pretty(&machine.state())?);

    watcher.abort();
    Ok(())
}
