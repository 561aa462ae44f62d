use std::future::Future;
use log::{info, warn};
use crate::config::file::Poll;
use super::Error;

pub const CLOSED: &str = "closed";

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Closed,
    /// The poll budget ran out first. Not an error: the provider may still
    /// close the repository later.
    StillPending { last_status: String },
}

/// Query `status` until it reports `closed`, at most `poll.attempts` times,
/// sleeping `poll.interval()` between consecutive queries.
///
/// Errors from `status` abort the wait immediately.
pub async fn wait_until_closed<F, Fut>(poll: &Poll, mut status: F) -> Result<Outcome, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, Error>>,
{
    let mut last_status = String::new();

    for attempt in 1..=poll.attempts {
        last_status = status().await?;
        if last_status == CLOSED {
            info!("Staging repository closed");
            return Ok(Outcome::Closed);
        }
        info!("Got repository status {last_status} ({attempt}/{})", poll.attempts);

        if attempt < poll.attempts {
            info!("Sleeping for {} seconds", poll.interval_secs);
            tokio::time::sleep(poll.interval()).await;
        }
    }

    warn!("Staging repository not closed after {} attempts, last status {last_status:?}", poll.attempts);
    Ok(Outcome::StillPending { last_status })
}
