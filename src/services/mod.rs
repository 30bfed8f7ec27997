//! Services for Tsundoku
//!
//! Outbound integrations and the deadline sweep built on top of them.

pub mod insults;
pub mod line;
pub mod scheduler;
pub mod sweep;

pub use insults::{GeminiInsults, InsultSource, StaticInsults, FALLBACK_INSULT};
pub use line::{LineMessenger, Messenger};
pub use scheduler::{NotificationScheduler, QStashScheduler, WorkflowPayload};
pub use sweep::{spawn_sweep_task, DeadlineSweeper, SweepReport};

use std::sync::Arc;
use tracing::info;

use crate::config::Args;

/// Pick the insult source from configuration
pub fn insult_source(args: &Args) -> Arc<dyn InsultSource> {
    match args.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            info!(model = %args.gemini_model, "Using Gemini for insult generation");
            Arc::new(GeminiInsults::new(
                &args.gemini_api_url,
                &args.gemini_model,
                key,
                args.request_timeout(),
            ))
        }
        None => {
            info!("GEMINI_API_KEY not set, using static insult pool");
            Arc::new(StaticInsults::new())
        }
    }
}

/// QStash scheduler when its settings are present
pub fn notification_scheduler(args: &Args) -> Option<Arc<dyn NotificationScheduler>> {
    let (url, token, host) = args.qstash()?;
    let scheduler = QStashScheduler::new(url, token, host, args.request_timeout());
    info!(callback = %scheduler.callback(), "Delayed deadline callbacks enabled");
    Some(Arc::new(scheduler))
}
