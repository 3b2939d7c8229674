use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wraith::events::EngineEvent;
use wraith::{CandleAggregator, Config, EventBus, FeedClient, SessionManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wraith=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!(feed_url = %config.feed_url, "starting wraith signal engine");

    // Composition root: feed -> aggregator -> session manager
    let (feed, commands) = FeedClient::new(Duration::from_secs(config.history_timeout_secs));
    let feed_task = feed.run(&config, commands);

    let aggregator = CandleAggregator::new(config.signal.window_capacity);
    let bus = EventBus::default();
    let manager = SessionManager::new(Arc::clone(&feed), aggregator, bus.clone(), config);

    // Log every downstream emission; real subscribers (chat front-end,
    // persistence sink) attach the same way.
    {
        let mut events = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(EngineEvent::PreCloseSignal { session, signal }) => {
                        info!(
                            session = %session.id,
                            symbol = %signal.symbol,
                            direction = signal.direction.label(),
                            confidence = signal.confidence,
                            p_up = signal.p_up,
                            "pre-close signal"
                        );
                    }
                    Ok(EngineEvent::SessionStarted(session)) => {
                        info!(session = %session.id, symbol = %session.symbol, "session started");
                    }
                    Ok(EngineEvent::SessionStopped(session)) => {
                        info!(session = %session.id, "session stopped");
                    }
                    Ok(EngineEvent::FeedDisconnected) => {
                        error!("feed disconnected");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Sessions are started by external collaborators (chat front-end,
    // admin surface) through the manager handle; keep the process alive
    // until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("shutting down, stopping all sessions");
    manager.stop_all();
    feed_task.abort();

    Ok(())
}
