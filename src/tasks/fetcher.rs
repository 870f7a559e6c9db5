use crate::api::PhotoSource;
use crate::events::{FetchOutcome, FetchRequest};
use anyhow::Result;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs page fetches against `source`:
/// - Every request is spawned immediately; several may be outstanding when a
///   search overlaps a page load. Gating is the gallery's job.
/// - Each completed fetch sends its own outcome, with the ticket it came
///   with, so this loop never waits on the gallery and keeps taking requests.
/// - One attempt per request. Failures travel back as `Err` inside the outcome.
pub async fn run<S: PhotoSource>(
    source: S,
    mut request_rx: Receiver<FetchRequest>,
    to_gallery: Sender<FetchOutcome>,
    cancel: CancellationToken,
) -> Result<()> {
    let source = Arc::new(source);
    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut requests_open = true;

    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!(outstanding = tasks.len(), "cancel received; exiting fetcher task");
                tasks.abort_all();
                break;
            }

            maybe_req = request_rx.recv(), if requests_open => {
                match maybe_req {
                    Some(FetchRequest(ticket)) => {
                        debug!(
                            generation = ticket.generation,
                            page = ticket.request.page,
                            query = ?ticket.request.query,
                            "fetch requested"
                        );
                        let source = Arc::clone(&source);
                        let to_gallery = to_gallery.clone();
                        tasks.spawn(async move {
                            let result = source.fetch_page(ticket.request.clone()).await;
                            if to_gallery.send(FetchOutcome { ticket, result }).await.is_err() {
                                debug!("gallery gone; outcome dropped");
                            }
                        });
                    }
                    None => requests_open = false,
                }
            }

            Some(joined) = tasks.join_next() => {
                if let Err(err) = joined {
                    warn!("fetch task failed to join: {err}");
                }
                if to_gallery.is_closed() {
                    warn!("gallery channel closed");
                    tasks.abort_all();
                    break;
                }
            }

            else => {
                // Requests closed and nothing outstanding.
                break;
            }
        }
    }
    Ok(())
}
