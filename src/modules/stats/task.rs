use async_trait::async_trait;
use poise::serenity_prelude::Context;
use std::time::Duration;
use tracing::{debug, info};

use super::database::{PendingMessages, StatsRegistry};
use crate::{tasks::Task, utils::now_timestamp};

/// Writes buffered message counts and starts a new period each month.
#[derive(Debug, Clone)]
pub struct StatsTask {
    db: StatsRegistry,
    pending: PendingMessages,
    interval: Duration,
}

impl StatsTask {
    pub fn new(db: StatsRegistry, pending: PendingMessages, interval: Duration) -> Self {
        Self { db, pending, interval }
    }
}

#[async_trait]
impl Task for StatsTask {
    fn name(&self) -> &str {
        "StatsFlush"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(self.interval)
    }

    async fn execute(&mut self, _ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.db.reset_if_due(now_timestamp()).await? {
            info!("Member stats reset for the new month");
        }

        let counts = self.pending.drain();
        if let Err(e) = self.db.add_messages(&counts).await {
            self.pending.restore(counts);
            return Err(e.into());
        }
        debug!("Flushed message counts for {} members", counts.len());
        Ok(())
    }
}
