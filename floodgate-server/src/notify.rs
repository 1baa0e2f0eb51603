//! Fire-and-forget notification delivery.

use crate::movies::Movie;
use anyhow::Result;
use std::time::Duration;

/// Delivers "movie created" notifications.
///
/// The actual transport (SMTP, webhook) is an external collaborator; this
/// implementation logs the delivery after a short dispatch delay so the
/// unit of work has a real asynchronous lifetime.
#[derive(Clone)]
pub struct Notifier {
    dispatch_delay: Duration,
}

impl Notifier {
    pub fn new() -> Self {
        Notifier {
            dispatch_delay: Duration::from_millis(10),
        }
    }

    pub async fn movie_created(&self, movie: &Movie) -> Result<()> {
        tokio::time::sleep(self.dispatch_delay).await;
        tracing::info!(id = movie.id, title = %movie.title, "movie-created notification delivered");
        Ok(())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
