#![allow(dead_code)]

use latch::api::{PageRequest, PhotoSource};
use latch::error::FetchError;
use latch::events::{FetchOutcome, FetchRequest, GalleryCommand, GalleryStatus, GalleryView};
use latch::favorites::Favorites;
use latch::photo::PhotoRecord;
use latch::store::KeyValueStore;
use latch::tasks::{fetcher, gallery};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub fn photo(id: impl Into<String>) -> PhotoRecord {
    let id = id.into();
    let url = format!("https://img.test/{id}");
    PhotoRecord::new(id, url)
}

pub fn photos(ids: std::ops::Range<u32>) -> Vec<PhotoRecord> {
    ids.map(|i| photo(format!("p{i}"))).collect()
}

#[derive(Clone)]
enum Scripted {
    Page(Vec<PhotoRecord>),
    Status(u16),
}

/// In-memory photo API: pages keyed by (query, page), with optional delays.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    pages: Arc<Mutex<HashMap<(Option<String>, u32), Scripted>>>,
    delays: Arc<Mutex<HashMap<(Option<String>, u32), Duration>>>,
    calls: Arc<Mutex<Vec<PageRequest>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing(self, page: u32, records: Vec<PhotoRecord>) -> Self {
        self.insert(None, page, Scripted::Page(records))
    }

    pub fn search(self, query: &str, page: u32, records: Vec<PhotoRecord>) -> Self {
        self.insert(Some(query.to_string()), page, Scripted::Page(records))
    }

    pub fn listing_status(self, page: u32, status: u16) -> Self {
        self.insert(None, page, Scripted::Status(status))
    }

    pub fn search_status(self, query: &str, page: u32, status: u16) -> Self {
        self.insert(Some(query.to_string()), page, Scripted::Status(status))
    }

    pub fn delay_listing(self, page: u32, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert((None, page), delay);
        self
    }

    fn insert(self, query: Option<String>, page: u32, value: Scripted) -> Self {
        self.pages.lock().unwrap().insert((query, page), value);
        self
    }

    pub fn calls(&self) -> Vec<PageRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl PhotoSource for ScriptedSource {
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PhotoRecord>, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        let key = (request.query.clone(), request.page);
        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.pages.lock().unwrap().get(&key).cloned();
        match scripted {
            Some(Scripted::Page(records)) => Ok(records),
            Some(Scripted::Status(status)) => Err(FetchError::Status {
                status,
                url: "https://api.test/photos".to_string(),
            }),
            // unscripted pages are past the end
            None => Ok(Vec::new()),
        }
    }
}

pub struct Pipeline {
    pub commands: mpsc::Sender<GalleryCommand>,
    pub views: mpsc::Receiver<GalleryView>,
    pub status: watch::Receiver<GalleryStatus>,
    pub cancel: CancellationToken,
    handles: Vec<JoinHandle<anyhow::Result<()>>>,
}

impl Pipeline {
    pub fn spawn<S: KeyValueStore>(
        source: ScriptedSource,
        favorites: Favorites<S>,
        per_page: u32,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<GalleryCommand>(16);
        let (fetch_tx, fetch_rx) = mpsc::channel::<FetchRequest>(8);
        let (outcome_tx, outcome_rx) = mpsc::channel::<FetchOutcome>(8);
        let (view_tx, view_rx) = mpsc::channel::<GalleryView>(64);
        let (status_tx, status_rx) = watch::channel(GalleryStatus::default());
        let cancel = CancellationToken::new();

        let fetcher = tokio::spawn(fetcher::run(source, fetch_rx, outcome_tx, cancel.clone()));
        let ports = gallery::GalleryPorts {
            commands: cmd_rx,
            outcomes: outcome_rx,
            to_fetcher: fetch_tx,
            to_view: view_tx,
            status: status_tx,
        };
        let gallery = tokio::spawn(gallery::run(per_page, favorites, ports, cancel.clone()));

        Self {
            commands: cmd_tx,
            views: view_rx,
            status: status_rx,
            cancel,
            handles: vec![fetcher, gallery],
        }
    }

    pub async fn send(&self, cmd: GalleryCommand) {
        self.commands.send(cmd).await.expect("gallery task gone");
    }

    pub async fn next_view(&mut self) -> GalleryView {
        tokio::time::timeout(Duration::from_secs(2), self.views.recv())
            .await
            .expect("timeout waiting for gallery view")
            .expect("view channel closed")
    }

    /// Skip views until one satisfies `pred`.
    pub async fn view_where(&mut self, pred: impl Fn(&GalleryView) -> bool) -> GalleryView {
        loop {
            let view = self.next_view().await;
            if pred(&view) {
                return view;
            }
        }
    }

    /// Assert nothing is published within `window`.
    pub async fn assert_quiet(&mut self, window: Duration) {
        let got = tokio::time::timeout(window, self.views.recv()).await;
        assert!(got.is_err(), "unexpected view: {:?}", got.ok().flatten());
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let res = handle.await.expect("task panicked");
            assert!(res.is_ok(), "task failed: {res:?}");
        }
    }
}
