//! Background readiness polling

use std::sync::Arc;
use std::time::Duration;

use medchat_agent::ChatController;
use medchat_ai::ChatClient;
use tokio::task::JoinHandle;

/// Check backend health once and gate sending on the result
pub async fn check_once(client: &ChatClient, controller: &ChatController) -> bool {
    let ready = match client.health().await {
        Ok(health) => {
            tracing::debug!(
                status = %health.status,
                model_status = %health.model_status,
                model = ?health.model,
                "health check"
            );
            health.is_ready()
        }
        Err(e) => {
            tracing::debug!("health check failed: {}", e);
            false
        }
    };
    if ready != controller.is_enabled() {
        tracing::info!(ready, "model readiness changed");
    }
    controller.set_enabled(ready);
    ready
}

/// Poll health every `interval` until the returned task is aborted
pub fn spawn_poller(
    client: ChatClient,
    controller: Arc<ChatController>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            check_once(&client, &controller).await;
        }
    })
}
