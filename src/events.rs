use crate::error::FetchError;
use crate::gallery::{LoadState, PageTicket, ViewMode};
use crate::photo::PhotoRecord;

/// User intent delivered to the gallery task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryCommand {
    LoadMore,
    Search(String),
    ClearSearch,
    ShowFavorites,
    ShowGallery,
    AddFavorite(String),
    RemoveFavorite(String),
    ToggleFavorite(String),
}

/// Gallery -> Fetcher
#[derive(Debug, Clone)]
pub struct FetchRequest(pub PageTicket);

/// Fetcher -> Gallery
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: PageTicket,
    pub result: Result<Vec<PhotoRecord>, FetchError>,
}

/// The subset of gallery state the scroll trigger needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GalleryStatus {
    pub load: LoadState,
    pub view: ViewMode,
}

impl GalleryStatus {
    pub fn accepts_scroll_load(&self) -> bool {
        self.load == LoadState::Idle && self.view == ViewMode::Gallery
    }
}

/// One photo as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownPhoto {
    pub photo: PhotoRecord,
    pub favorite: bool,
}

/// Snapshot published after every gallery state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    pub view: ViewMode,
    pub load: LoadState,
    pub page: u32,
    pub search: Option<String>,
    pub photos: Vec<ShownPhoto>,
    pub favorites_count: usize,
}

impl GalleryView {
    pub fn ids(&self) -> Vec<&str> {
        self.photos.iter().map(|p| p.photo.id.as_str()).collect()
    }
}
