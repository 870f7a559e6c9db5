//! Gallery state and its load state machine.
//!
//! ```text
//!   Idle ──begin──▶ Loading ──non-empty / error──▶ Idle
//!                      └────────empty page───────▶ Exhausted
//!   any ──new search──▶ Loading(page 1)        Exhausted stays until a new search
//! ```
//!
//! Every fetch carries a [`PageTicket`] stamped with the generation of the
//! search context that issued it. Starting a search (or clearing one) bumps
//! the generation, so results for an older context are recognised as stale
//! and dropped instead of being appended to unrelated photos.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::api::PageRequest;
use crate::error::FetchError;
use crate::photo::PhotoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Gallery,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Next page of the current context, appended with dedup.
    NextPage,
    /// First page of a new search, replacing the sequence.
    SearchStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub generation: u64,
    pub kind: FetchKind,
    pub request: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended { added: usize, skipped: usize },
    Replaced { count: usize },
    Exhausted,
    Failed,
    /// The ticket belonged to an older search context.
    Stale,
}

#[derive(Debug, Clone)]
pub struct GalleryState {
    photos: Vec<PhotoRecord>,
    ids: HashSet<String>,
    page: u32,
    per_page: u32,
    state: LoadState,
    search: Option<String>,
    /// Term whose results the sequence currently holds.
    committed_search: Option<String>,
    view: ViewMode,
    generation: u64,
}

impl GalleryState {
    pub fn new(per_page: u32) -> Self {
        Self {
            photos: Vec::new(),
            ids: HashSet::new(),
            page: 1,
            per_page,
            state: LoadState::Idle,
            search: None,
            committed_search: None,
            view: ViewMode::Gallery,
            generation: 0,
        }
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn find(&self, id: &str) -> Option<&PhotoRecord> {
        self.photos.iter().find(|p| p.id == id)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn has_more(&self) -> bool {
        self.state != LoadState::Exhausted
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start loading the next page, or `None` when a fetch is in flight, the
    /// favorites view is showing, or the context is exhausted.
    pub fn begin_load(&mut self) -> Option<PageTicket> {
        if self.view == ViewMode::Favorites {
            debug!("load-more ignored: viewing favorites");
            return None;
        }
        match self.state {
            LoadState::Loading => {
                debug!("load-more ignored: fetch in flight");
                None
            }
            LoadState::Exhausted => {
                debug!("load-more ignored: no more results");
                None
            }
            LoadState::Idle => {
                self.state = LoadState::Loading;
                let request = PageRequest {
                    page: self.page,
                    per_page: self.per_page,
                    query: self.search.clone(),
                };
                Some(PageTicket {
                    generation: self.generation,
                    kind: FetchKind::NextPage,
                    request,
                })
            }
        }
    }

    /// Start a new search context for `term`. Blank terms are ignored.
    ///
    /// If the search fails, the term whose results are on display (or none,
    /// for the listing) becomes active again together with its page cursor,
    /// so a later load-more continues that context instead of appending
    /// pages of the failed term onto it.
    pub fn begin_search(&mut self, term: &str) -> Option<PageTicket> {
        let term = term.trim();
        if term.is_empty() {
            debug!("search ignored: blank term");
            return None;
        }
        self.generation += 1;
        self.search = Some(term.to_string());
        self.view = ViewMode::Gallery;
        self.state = LoadState::Loading;
        Some(PageTicket {
            generation: self.generation,
            kind: FetchKind::SearchStart,
            request: PageRequest::search(term, 1, self.per_page),
        })
    }

    /// Drop the search term and return to an empty, idle listing context.
    /// Returns `false` when no search was active.
    pub fn clear_search(&mut self) -> bool {
        if self.search.is_none() {
            return false;
        }
        self.generation += 1;
        self.search = None;
        self.committed_search = None;
        self.photos.clear();
        self.ids.clear();
        self.page = 1;
        self.state = LoadState::Idle;
        true
    }

    /// Commit the result of the fetch described by `ticket`.
    pub fn finish(
        &mut self,
        ticket: &PageTicket,
        result: Result<Vec<PhotoRecord>, FetchError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                page = ticket.request.page,
                "discarding stale page"
            );
            return LoadOutcome::Stale;
        }
        match ticket.kind {
            FetchKind::NextPage => self.finish_page(result),
            FetchKind::SearchStart => self.finish_search(result),
        }
    }

    fn finish_page(&mut self, result: Result<Vec<PhotoRecord>, FetchError>) -> LoadOutcome {
        match result {
            Ok(batch) if batch.is_empty() => {
                info!(page = self.page, "no more results");
                self.state = LoadState::Exhausted;
                LoadOutcome::Exhausted
            }
            Ok(batch) => {
                let total = batch.len();
                let before = self.photos.len();
                for photo in batch {
                    if self.ids.insert(photo.id.clone()) {
                        self.photos.push(photo);
                    }
                }
                let added = self.photos.len() - before;
                let skipped = total - added;
                self.page += 1;
                self.state = LoadState::Idle;
                debug!(added, skipped, next_page = self.page, "page appended");
                LoadOutcome::Appended { added, skipped }
            }
            Err(err) => {
                warn!(page = self.page, "error fetching photos: {err}");
                self.state = LoadState::Idle;
                LoadOutcome::Failed
            }
        }
    }

    fn finish_search(&mut self, result: Result<Vec<PhotoRecord>, FetchError>) -> LoadOutcome {
        match result {
            Ok(batch) => {
                let count = batch.len();
                self.ids = batch.iter().map(|p| p.id.clone()).collect();
                self.photos = batch;
                self.page = 2;
                self.state = LoadState::Idle;
                self.committed_search = self.search.clone();
                info!(query = ?self.search, count, "search results loaded");
                LoadOutcome::Replaced { count }
            }
            Err(err) => {
                warn!(query = ?self.search, "error searching photos: {err}");
                self.search = self.committed_search.clone();
                self.state = LoadState::Idle;
                LoadOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: impl Into<String>) -> PhotoRecord {
        let id = id.into();
        let url = format!("https://img/{id}");
        PhotoRecord::new(id, url)
    }

    fn batch(ids: std::ops::Range<u32>) -> Vec<PhotoRecord> {
        ids.map(|i| photo(format!("p{i}"))).collect()
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            status: 503,
            url: "https://api.example.test/photos".into(),
        }
    }

    #[test]
    fn pages_append_with_dedup_until_exhausted() {
        let mut g = GalleryState::new(10);

        let t = g.begin_load().unwrap();
        assert_eq!(t.request, PageRequest::listing(1, 10));
        assert_eq!(g.finish(&t, Ok(batch(0..10))), LoadOutcome::Appended { added: 10, skipped: 0 });
        assert_eq!(g.photos().len(), 10);
        assert_eq!(g.page(), 2);
        assert!(g.has_more());

        let t = g.begin_load().unwrap();
        assert_eq!(t.request.page, 2);
        // 3 ids repeat page 1
        assert_eq!(g.finish(&t, Ok(batch(7..17))), LoadOutcome::Appended { added: 7, skipped: 3 });
        assert_eq!(g.photos().len(), 17);
        assert_eq!(g.page(), 3);

        let t = g.begin_load().unwrap();
        assert_eq!(g.finish(&t, Ok(Vec::new())), LoadOutcome::Exhausted);
        assert!(!g.has_more());
        assert_eq!(g.page(), 3);
        assert_eq!(g.load_state(), LoadState::Exhausted);
        assert!(g.begin_load().is_none());
        assert!(g.begin_load().is_none());
    }

    #[test]
    fn duplicates_inside_one_page_are_dropped() {
        let mut g = GalleryState::new(10);
        let t = g.begin_load().unwrap();
        let page = vec![photo("a"), photo("b"), photo("a")];
        assert_eq!(g.finish(&t, Ok(page)), LoadOutcome::Appended { added: 2, skipped: 1 });
    }

    #[test]
    fn only_one_load_in_flight() {
        let mut g = GalleryState::new(10);
        let t = g.begin_load().unwrap();
        assert!(g.is_loading());
        assert!(g.begin_load().is_none());
        g.finish(&t, Ok(batch(0..1)));
        assert!(!g.is_loading());
        assert!(g.begin_load().is_some());
    }

    #[test]
    fn failure_releases_loading_and_keeps_cursor() {
        let mut g = GalleryState::new(10);
        let t = g.begin_load().unwrap();
        g.finish(&t, Ok(batch(0..10)));

        let t = g.begin_load().unwrap();
        assert_eq!(g.finish(&t, Err(server_error())), LoadOutcome::Failed);
        assert_eq!(g.load_state(), LoadState::Idle);
        assert_eq!(g.page(), 2);
        assert_eq!(g.photos().len(), 10);
        assert_eq!(g.begin_load().unwrap().request.page, 2);
    }

    #[test]
    fn favorites_view_blocks_loading() {
        let mut g = GalleryState::new(10);
        g.set_view(ViewMode::Favorites);
        assert!(g.begin_load().is_none());
        assert_eq!(g.load_state(), LoadState::Idle);
        g.set_view(ViewMode::Gallery);
        assert!(g.begin_load().is_some());
    }

    #[test]
    fn search_replaces_sequence_and_resets_exhaustion() {
        let mut g = GalleryState::new(10);
        let t = g.begin_load().unwrap();
        g.finish(&t, Ok(batch(0..10)));
        let t = g.begin_load().unwrap();
        g.finish(&t, Ok(Vec::new()));
        assert!(!g.has_more());

        let t = g.begin_search("  cats ").unwrap();
        assert_eq!(t.request, PageRequest::search("cats", 1, 10));
        // overlapping id p3 is kept: no dedup against the previous context
        let results = vec![photo("p3"), photo("c1")];
        assert_eq!(g.finish(&t, Ok(results.clone())), LoadOutcome::Replaced { count: 2 });
        assert_eq!(g.photos(), results.as_slice());
        assert_eq!(g.page(), 2);
        assert!(g.has_more());
        assert_eq!(g.search(), Some("cats"));

        let next = g.begin_load().unwrap();
        assert_eq!(next.request, PageRequest::search("cats", 2, 10));
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut g = GalleryState::new(10);
        let before = g.generation();
        assert!(g.begin_search("   ").is_none());
        assert!(g.begin_search("").is_none());
        assert_eq!(g.generation(), before);
        assert_eq!(g.load_state(), LoadState::Idle);
    }

    #[test]
    fn stale_page_after_search_is_dropped() {
        let mut g = GalleryState::new(10);
        let page_ticket = g.begin_load().unwrap();
        let search_ticket = g.begin_search("dogs").unwrap();

        let dogs = vec![photo("d1")];
        g.finish(&search_ticket, Ok(dogs.clone()));
        // the listing page resolves late
        assert_eq!(g.finish(&page_ticket, Ok(batch(0..10))), LoadOutcome::Stale);
        assert_eq!(g.photos(), dogs.as_slice());
        assert_eq!(g.page(), 2);
    }

    #[test]
    fn stale_page_does_not_release_newer_loading() {
        let mut g = GalleryState::new(10);
        let page_ticket = g.begin_load().unwrap();
        let _search_ticket = g.begin_search("dogs").unwrap();
        assert_eq!(g.finish(&page_ticket, Err(server_error())), LoadOutcome::Stale);
        assert!(g.is_loading());
    }

    #[test]
    fn failed_search_keeps_previous_photos() {
        let mut g = GalleryState::new(10);
        let t = g.begin_load().unwrap();
        g.finish(&t, Ok(batch(0..4)));
        let t = g.begin_search("x").unwrap();
        assert_eq!(g.finish(&t, Err(server_error())), LoadOutcome::Failed);
        assert_eq!(g.photos().len(), 4);
        assert_eq!(g.load_state(), LoadState::Idle);
        assert_eq!(g.search(), None);
        assert_eq!(g.begin_load().unwrap().request, PageRequest::listing(2, 10));
    }

    #[test]
    fn failed_search_restores_the_term_on_display() {
        let mut g = GalleryState::new(10);
        let t = g.begin_search("cats").unwrap();
        g.finish(&t, Ok(batch(0..10)));
        let abandoned = g.begin_search("dogs").unwrap();
        let t = g.begin_search("owls").unwrap();
        assert_eq!(g.finish(&abandoned, Ok(batch(20..30))), LoadOutcome::Stale);
        assert_eq!(g.finish(&t, Err(server_error())), LoadOutcome::Failed);
        assert_eq!(g.search(), Some("cats"));
        assert_eq!(g.begin_load().unwrap().request, PageRequest::search("cats", 2, 10));
    }

    #[test]
    fn clear_search_returns_to_empty_listing() {
        let mut g = GalleryState::new(10);
        assert!(!g.clear_search());
        let t = g.begin_search("x").unwrap();
        g.finish(&t, Ok(batch(0..3)));
        assert!(g.clear_search());
        assert!(g.photos().is_empty());
        assert_eq!(g.search(), None);
        assert_eq!(g.begin_load().unwrap().request, PageRequest::listing(1, 10));
    }

    #[test]
    fn search_switches_back_to_gallery_view() {
        let mut g = GalleryState::new(10);
        g.set_view(ViewMode::Favorites);
        g.begin_search("x").unwrap();
        assert_eq!(g.view(), ViewMode::Gallery);
    }
}
