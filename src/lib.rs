use std::sync::Arc;

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod services;
pub mod telegram;
pub mod worker;

/// Shared handles a worker's handlers and FSMs operate through.
#[derive(Clone)]
pub struct Store {
    pub db: db::DbPool,
    pub tg: telegram::client::TgClient,
    pub config: Arc<config::Config>,
    pub registry: services::registry::FsmRegistry,
    pub metrics: metrics::Metrics,
}
