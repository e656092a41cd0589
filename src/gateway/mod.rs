//! Gateway — wires the store, generator, and mailer into the two entry
//! points: the HTTP intake API and the background scheduler loop.

pub(crate) mod intake;
pub(crate) mod proactive;
pub(crate) mod prompts;
pub(crate) mod recommend;
pub(crate) mod scheduler;

#[cfg(test)]
pub(crate) mod tests;

use crate::api::{self, ApiState};
use solace_core::config::{ApiConfig, SchedulerConfig};
use solace_core::traits::{Generator, Mailer};
use solace_memory::Store;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The central service wiring.
pub struct Gateway {
    generator: Arc<dyn Generator>,
    mailer: Arc<dyn Mailer>,
    memory: Store,
    scheduler_config: SchedulerConfig,
    api_config: ApiConfig,
    uptime: Instant,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        generator: Arc<dyn Generator>,
        mailer: Arc<dyn Mailer>,
        memory: Store,
        scheduler_config: SchedulerConfig,
        api_config: ApiConfig,
    ) -> Self {
        Self {
            generator,
            mailer,
            memory,
            scheduler_config,
            api_config,
            uptime: Instant::now(),
        }
    }

    /// Run the service: spawn the scheduler loop, then serve the API.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "Solace gateway running | generator: {} | mailer: {} | scheduler: {}",
            self.generator.name(),
            self.mailer.name(),
            if self.scheduler_config.enabled {
                if self.scheduler_config.fast_mode {
                    "enabled (fast mode)"
                } else {
                    "enabled"
                }
            } else {
                "disabled"
            },
        );

        if self.scheduler_config.enabled {
            let store = self.memory.clone();
            let generator = self.generator.clone();
            let mailer = self.mailer.clone();
            let poll_secs = self.scheduler_config.poll_interval_secs;
            tokio::spawn(async move {
                scheduler::scheduler_loop(store, generator, mailer, poll_secs).await;
            });
        }

        let state = ApiState {
            store: self.memory.clone(),
            generator: self.generator.clone(),
            mailer: self.mailer.clone(),
            api_key: if self.api_config.api_key.is_empty() {
                None
            } else {
                Some(self.api_config.api_key.clone())
            },
            uptime: self.uptime,
            fast_mode: self.scheduler_config.fast_mode,
        };

        let app = api::router(state);
        let addr = format!("{}:{}", self.api_config.host, self.api_config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API listening on {addr}");
        axum::serve(listener, app).await?;

        Ok(())
    }
}
