//! Deadline sweep
//!
//! Scans eligible books, and for each one whose deadline has passed:
//! generate a taunt, push it, then mark the book insulted. The mark only
//! happens after a successful push, so a failed delivery is retried on the
//! next sweep.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::BookStore;
use crate::services::insults::InsultSource;
use crate::services::line::Messenger;
use crate::types::{Book, BookStatus, Result, TsundokuError};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Books found overdue, whether or not their push succeeded
    pub expired: usize,
    /// Books pushed and marked insulted
    pub notified: usize,
}

impl SweepReport {
    pub fn message(&self) -> String {
        format!("Checked deadlines. Found {} expired books.", self.expired)
    }
}

/// Runs the sweep and the single-book notify step
pub struct DeadlineSweeper {
    store: Arc<dyn BookStore>,
    insults: Arc<dyn InsultSource>,
    messenger: Arc<dyn Messenger>,
    statuses: Vec<BookStatus>,
    running: Mutex<()>,
}

impl DeadlineSweeper {
    pub fn new(
        store: Arc<dyn BookStore>,
        insults: Arc<dyn InsultSource>,
        messenger: Arc<dyn Messenger>,
        statuses: Vec<BookStatus>,
    ) -> Self {
        Self {
            store,
            insults,
            messenger,
            statuses,
            running: Mutex::new(()),
        }
    }

    /// Whether `book` is due a notification at `now`
    pub fn is_due(&self, book: &Book, now: DateTime<Utc>) -> bool {
        self.statuses.contains(&book.status) && book.is_overdue(now)
    }

    /// Sweep every eligible book against `now`.
    ///
    /// Returns `Conflict` if another sweep is already running in this
    /// process. Only the store query can fail the sweep as a whole.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| TsundokuError::Conflict("a deadline sweep is already running".into()))?;

        let books = self.store.list_by_status(&self.statuses).await?;
        debug!(candidates = books.len(), "Deadline sweep started");

        let mut report = SweepReport::default();
        for book in books.iter().filter(|b| b.is_overdue(now)) {
            info!(
                book_id = %book.book_id,
                user_id = %book.user_id,
                title = %book.title,
                insult_level = book.insult_level,
                "Found expired book"
            );
            report.expired += 1;

            match self.notify(book).await {
                Ok(()) => report.notified += 1,
                Err(e) => warn!(book_id = %book.book_id, error = %e, "Skipping book"),
            }
        }

        info!(
            expired = report.expired,
            notified = report.notified,
            "Deadline sweep finished"
        );
        Ok(report)
    }

    /// Generate, push and mark one book.
    ///
    /// The caller decides whether the book is due.
    pub async fn notify(&self, book: &Book) -> Result<()> {
        let message = self.insults.generate(book).await?;

        self.messenger.push(&book.user_id, &message).await?;

        // The owner may have completed or deleted the book during the push
        if !self
            .store
            .mark_if(&book.book_id, &self.statuses, BookStatus::Insulted)
            .await?
        {
            return Err(TsundokuError::Conflict(format!(
                "book {} changed before it could be marked",
                book.book_id
            )));
        }

        Ok(())
    }
}

/// Run the sweep every `interval` in a background task
pub fn spawn_sweep_task(
    sweeper: Arc<DeadlineSweeper>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.run(Utc::now()).await {
                warn!(error = %e, "Scheduled deadline sweep failed");
            }
        }
    })
}
