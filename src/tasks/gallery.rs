use crate::events::{
    FetchOutcome, FetchRequest, GalleryCommand, GalleryStatus, GalleryView, ShownPhoto,
};
use crate::favorites::Favorites;
use crate::gallery::{GalleryState, LoadOutcome, PageTicket, ViewMode};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Channel ends the gallery task owns.
pub struct GalleryPorts {
    pub commands: Receiver<GalleryCommand>,
    pub outcomes: Receiver<FetchOutcome>,
    pub to_fetcher: Sender<FetchRequest>,
    pub to_view: Sender<GalleryView>,
    pub status: watch::Sender<GalleryStatus>,
}

/// Owns the gallery and favorites state and applies commands and fetch
/// outcomes to them one at a time.
///
/// Rules:
/// - The first page is requested as soon as the task starts.
/// - Load-more, search and fetch commits go through [`GalleryState`], which
///   keeps at most one page fetch in flight and drops stale results.
/// - Favorite commands name a photo id; the record is looked up in the
///   current gallery first, then among the favorites.
/// - A [`GalleryView`] is published after every change, and the scroll
///   trigger's [`GalleryStatus`] is kept current.
#[instrument(skip_all, fields(per_page = per_page))]
pub async fn run<S: KeyValueStore>(
    per_page: u32,
    mut favorites: Favorites<S>,
    ports: GalleryPorts,
    cancel: CancellationToken,
) -> Result<()> {
    let GalleryPorts {
        mut commands,
        mut outcomes,
        to_fetcher,
        to_view,
        status,
    } = ports;
    let mut gallery = GalleryState::new(per_page);
    let mut commands_open = true;

    if let Some(ticket) = gallery.begin_load() {
        request(&to_fetcher, ticket).await?;
    }
    if !publish(&gallery, &favorites, &to_view, &status).await {
        return Ok(());
    }

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting gallery task");
                break;
            }

            maybe_cmd = commands.recv(), if commands_open => {
                let Some(cmd) = maybe_cmd else {
                    debug!("command channel closed");
                    commands_open = false;
                    continue;
                };
                debug!(?cmd, "gallery command");
                let changed = apply(cmd, &mut gallery, &mut favorites, &to_fetcher).await?;
                if changed && !publish(&gallery, &favorites, &to_view, &status).await {
                    break;
                }
            }

            maybe_outcome = outcomes.recv() => {
                let Some(FetchOutcome { ticket, result }) = maybe_outcome else {
                    warn!("fetcher channel closed");
                    break;
                };
                let outcome = gallery.finish(&ticket, result);
                debug!(?outcome, page = gallery.page(), "fetch committed");
                if outcome != LoadOutcome::Stale
                    && !publish(&gallery, &favorites, &to_view, &status).await
                {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply one command. Returns whether anything visible changed.
async fn apply<S: KeyValueStore>(
    cmd: GalleryCommand,
    gallery: &mut GalleryState,
    favorites: &mut Favorites<S>,
    to_fetcher: &Sender<FetchRequest>,
) -> Result<bool> {
    let changed = match cmd {
        GalleryCommand::LoadMore => match gallery.begin_load() {
            Some(ticket) => {
                request(to_fetcher, ticket).await?;
                true
            }
            None => false,
        },
        GalleryCommand::Search(term) => match gallery.begin_search(&term) {
            Some(ticket) => {
                info!(query = %term.trim(), "search started");
                request(to_fetcher, ticket).await?;
                true
            }
            None => false,
        },
        GalleryCommand::ClearSearch => {
            if !gallery.clear_search() {
                return Ok(false);
            }
            if let Some(ticket) = gallery.begin_load() {
                request(to_fetcher, ticket).await?;
            }
            true
        }
        GalleryCommand::ShowFavorites => switch_view(gallery, ViewMode::Favorites),
        GalleryCommand::ShowGallery => switch_view(gallery, ViewMode::Gallery),
        GalleryCommand::AddFavorite(id) => {
            let Some(record) = lookup(&id, gallery, favorites) else {
                warn!(%id, "favorite: unknown photo id");
                return Ok(false);
            };
            match favorites.add(record) {
                Ok(added) => added,
                Err(err) => {
                    error!(%id, "failed to persist favorites: {err}");
                    true
                }
            }
        }
        GalleryCommand::RemoveFavorite(id) => match favorites.remove(&id) {
            Ok(removed) => removed,
            Err(err) => {
                error!(%id, "failed to persist favorites: {err}");
                true
            }
        },
        GalleryCommand::ToggleFavorite(id) => {
            let Some(record) = lookup(&id, gallery, favorites) else {
                warn!(%id, "favorite: unknown photo id");
                return Ok(false);
            };
            if let Err(err) = favorites.toggle(record) {
                error!(%id, "failed to persist favorites: {err}");
            }
            true
        }
    };
    Ok(changed)
}

fn switch_view(gallery: &mut GalleryState, view: ViewMode) -> bool {
    if gallery.view() == view {
        return false;
    }
    gallery.set_view(view);
    true
}

fn lookup<S: KeyValueStore>(
    id: &str,
    gallery: &GalleryState,
    favorites: &Favorites<S>,
) -> Option<crate::photo::PhotoRecord> {
    gallery.find(id).or_else(|| favorites.get(id)).cloned()
}

async fn request(to_fetcher: &Sender<FetchRequest>, ticket: PageTicket) -> Result<()> {
    debug!(
        generation = ticket.generation,
        page = ticket.request.page,
        "requesting page"
    );
    to_fetcher
        .send(FetchRequest(ticket))
        .await
        .context("fetcher channel closed")
}

/// Build the current view. Returns `false` once the view side has gone away.
async fn publish<S: KeyValueStore>(
    gallery: &GalleryState,
    favorites: &Favorites<S>,
    to_view: &Sender<GalleryView>,
    status: &watch::Sender<GalleryStatus>,
) -> bool {
    status.send_replace(GalleryStatus {
        load: gallery.load_state(),
        view: gallery.view(),
    });

    let source = match gallery.view() {
        ViewMode::Gallery => gallery.photos(),
        ViewMode::Favorites => favorites.records(),
    };
    let photos = source
        .iter()
        .map(|photo| ShownPhoto {
            favorite: favorites.contains(&photo.id),
            photo: photo.clone(),
        })
        .collect();
    let view = GalleryView {
        view: gallery.view(),
        load: gallery.load_state(),
        page: gallery.page(),
        search: gallery.search().map(str::to_string),
        photos,
        favorites_count: favorites.len(),
    };

    if to_view.send(view).await.is_err() {
        info!("view channel closed");
        return false;
    }
    true
}
