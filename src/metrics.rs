use axum::Router;
use axum::routing::get;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use crate::error::BotError;

/// Per-worker gauges, exposed over HTTP in the Prometheus text format.
#[derive(Clone)]
pub struct Metrics {
    pub active_games: IntGauge,
    pub active_players: IntGauge,
    registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Metrics, BotError> {
        let registry = Registry::new();
        let active_games = IntGauge::new("app_active_games", "Number of games in progress")?;
        let active_players = IntGauge::new("app_active_players", "Number of players in running games")?;
        registry.register(Box::new(active_games.clone()))?;
        registry.register(Box::new(active_players.clone()))?;
        Ok(Metrics {
            active_games,
            active_players,
            registry,
        })
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub async fn serve(self, port: u16) -> Result<(), BotError> {
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = self.clone();
                async move { metrics.render() }
            }),
        );
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!("metrics server listening on port {port}");
        axum::serve(listener, app)
            .await
            .map_err(|e| BotError::Internal(format!("metrics server: {e}")))
    }
}
