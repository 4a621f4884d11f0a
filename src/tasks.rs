use futures::future::join_all;
use poise::serenity_prelude::Context;
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Periodic work. `schedule` is asked again after every run; `None` stops
/// the task.
#[async_trait::async_trait]
pub trait Task: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn schedule(&self) -> Option<Duration>;
    async fn execute(&mut self, ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Default)]
pub struct TaskManager {
    tasks: Mutex<Vec<Box<dyn Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_task(&self, task: impl Task + 'static) {
        debug!("Registering task {}", task.name());
        self.tasks.lock().await.push(Box::new(task));
    }

    pub async fn start_tasks(&self, ctx: Context) {
        let mut tasks = self.tasks.lock().await;
        let mut handles = self.handles.lock().await;

        for mut task in tasks.drain(..) {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                while let Some(interval) = task.schedule() {
                    tokio::time::sleep(interval).await;
                    if let Err(e) = task.execute(&ctx).await {
                        error!("Task {} failed: {}", task.name(), e);
                    }
                }
                debug!("Task {} stopped", task.name());
            }));
        }
    }

    pub async fn shutdown(&self) {
        let mut handles = self.handles.lock().await;
        for handle in handles.iter() {
            handle.abort();
        }
        join_all(handles.drain(..)).await;
    }
}
