//! Ladle admin dashboard runtime: wires the notification transport, the
//! REST client, and the shared unread badge together, then reports badge
//! changes until the process is asked to stop.

use std::sync::Arc;

use ladle_core::AdminConfig;
use ladle_notify::{start_health_check, NotificationTransport, NotificationsApi, TransportConfig};
use ladle_unread::UnreadCounts;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ladle_admin=info,ladle_notify=debug,ladle_unread=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AdminConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        page_size = config.page_size,
        "Loaded admin configuration",
    );

    // --- REST client ---
    let api = Arc::new(NotificationsApi::new(
        config.api_url.clone(),
        config.auth_token_env.clone(),
    ));

    // --- Notification transport ---
    let transport = NotificationTransport::new(TransportConfig::from_admin(&config));

    // --- Health check ---
    let health_handle = start_health_check(Arc::clone(&transport));

    // --- Unread badge ---
    let counts = UnreadCounts::start(api, Arc::clone(&transport), config.page_size).await;
    tracing::info!(unread = counts.count(), "Unread badge ready");

    // Report badge changes until shutdown.
    let mut badge = counts.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = badge.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!(unread = *badge.borrow_and_update(), "Unread badge changed");
            }
        }
    }

    // --- Post-shutdown cleanup ---
    counts.shutdown();
    transport.disconnect();
    health_handle.abort();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the dashboard
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
