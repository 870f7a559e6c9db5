use crate::events::{GalleryCommand, GalleryStatus};
use crate::scroll::{Throttle, ViewportMetrics};
use anyhow::Result;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

#[derive(Debug, Clone, Copy)]
pub struct ScrollOptions {
    pub threshold: f64,
    pub throttle: Duration,
}

/// Scroll listener. Lives from spawn until cancellation (or until the
/// metrics sender is dropped), and is the only place scroll events turn
/// into `LoadMore`.
///
/// Events are throttled: the first event in a window is handled at once,
/// and the latest event refused during the window is handled when it ends.
/// A handled event requests a page only when the viewport is near the
/// bottom and the gallery is idle in the gallery view.
#[instrument(skip_all, fields(threshold = opts.threshold, throttle_ms = opts.throttle.as_millis() as u64))]
pub async fn run(
    mut metrics_rx: Receiver<ViewportMetrics>,
    status: watch::Receiver<GalleryStatus>,
    to_gallery: Sender<GalleryCommand>,
    opts: ScrollOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut throttle = Throttle::new(opts.throttle);
    let mut pending: Option<ViewportMetrics> = None;
    info!("scroll listener installed");

    loop {
        let trailing = pending.and(throttle.next_slot());
        select! {
            _ = cancel.cancelled() => break,

            maybe_metrics = metrics_rx.recv() => {
                let Some(metrics) = maybe_metrics else {
                    debug!("viewport channel closed");
                    break;
                };
                if throttle.admit(Instant::now()) {
                    pending = None;
                    if !handle(metrics, &status, &to_gallery, opts.threshold).await {
                        break;
                    }
                } else {
                    trace!(?metrics, "scroll throttled");
                    pending = Some(metrics);
                }
            }

            _ = sleep_until(trailing.unwrap_or_else(Instant::now)), if trailing.is_some() => {
                if let Some(metrics) = pending.take() {
                    if throttle.admit(Instant::now()) {
                        if !handle(metrics, &status, &to_gallery, opts.threshold).await {
                            break;
                        }
                    } else {
                        pending = Some(metrics);
                    }
                }
            }
        }
    }

    info!("scroll listener removed");
    Ok(())
}

/// Returns `false` once the gallery side has gone away.
async fn handle(
    metrics: ViewportMetrics,
    status: &watch::Receiver<GalleryStatus>,
    to_gallery: &Sender<GalleryCommand>,
    threshold: f64,
) -> bool {
    if !metrics.near_bottom(threshold) {
        return true;
    }
    let accepts = status.borrow().accepts_scroll_load();
    if !accepts {
        trace!("near bottom but gallery busy or showing favorites");
        return true;
    }
    debug!(?metrics, "near bottom; requesting next page");
    to_gallery.send(GalleryCommand::LoadMore).await.is_ok()
}
