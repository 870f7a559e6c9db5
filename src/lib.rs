pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod gallery;
pub mod photo;
pub mod scroll;
pub mod shell;
pub mod store;
pub mod tasks {
    pub mod fetcher;
    pub mod gallery;
    pub mod scroll;
}
