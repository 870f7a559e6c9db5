//! Line-oriented front end: parses typed commands and renders gallery views.

use std::fmt::Write as _;

use anyhow::{Context, Result, bail};

use crate::events::{GalleryCommand, GalleryView};
use crate::gallery::{LoadState, ViewMode};
use crate::scroll::ViewportMetrics;

pub const TITLE: &str = "L@TCH";

pub const HELP: &str = "\
commands:
  more                          load the next page
  scroll <y> <viewport> <doc>   report a scroll position
  search <term>                 search photos
  clear                         leave search, back to the listing
  favorites | gallery           switch view
  fav <id> | unfav <id>         add / remove a favorite
  toggle <id>                   flip a favorite
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellInput {
    Command(GalleryCommand),
    Scroll(ViewportMetrics),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellInput>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "more" => ShellInput::Command(GalleryCommand::LoadMore),
        "search" => ShellInput::Command(GalleryCommand::Search(rest.to_string())),
        "clear" => ShellInput::Command(GalleryCommand::ClearSearch),
        "favorites" | "favs" => ShellInput::Command(GalleryCommand::ShowFavorites),
        "gallery" => ShellInput::Command(GalleryCommand::ShowGallery),
        "fav" => ShellInput::Command(GalleryCommand::AddFavorite(required_id(rest)?)),
        "unfav" => ShellInput::Command(GalleryCommand::RemoveFavorite(required_id(rest)?)),
        "toggle" => ShellInput::Command(GalleryCommand::ToggleFavorite(required_id(rest)?)),
        "scroll" => ShellInput::Scroll(parse_metrics(rest)?),
        "help" | "?" => ShellInput::Help,
        "quit" | "exit" | "q" => ShellInput::Quit,
        other => bail!("unknown command {other:?} (try `help`)"),
    };
    Ok(Some(input))
}

fn required_id(rest: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("expected a photo id");
    }
    Ok(rest.to_string())
}

fn parse_metrics(rest: &str) -> Result<ViewportMetrics> {
    let values = rest
        .split_whitespace()
        .map(|v| v.parse::<f64>().with_context(|| format!("bad number {v:?}")))
        .collect::<Result<Vec<_>>>()?;
    match values.as_slice() {
        [y, viewport, document] => Ok(ViewportMetrics::new(*y, *viewport, *document)),
        _ => bail!("usage: scroll <y> <viewport> <document>"),
    }
}

/// Render a view as plain text.
pub fn render(view: &GalleryView) -> String {
    let mut out = String::new();
    let heading = match (view.view, view.search.as_deref()) {
        (ViewMode::Favorites, _) => format!("{TITLE} · favorites ({})", view.favorites_count),
        (ViewMode::Gallery, Some(term)) => format!("{TITLE} · search {term:?}"),
        (ViewMode::Gallery, None) => TITLE.to_string(),
    };
    let _ = writeln!(out, "{heading}");

    if view.photos.is_empty() && view.load != LoadState::Loading {
        let empty = match view.view {
            ViewMode::Favorites => "  (no favorites yet)",
            ViewMode::Gallery => "  (no photos)",
        };
        let _ = writeln!(out, "{empty}");
    }
    for shown in &view.photos {
        let mark = if shown.favorite { '♥' } else { ' ' };
        let _ = writeln!(
            out,
            "  {mark} {:<14} {}  {}",
            shown.photo.id,
            shown.photo.caption(),
            shown.photo.urls.regular
        );
    }

    if view.view == ViewMode::Gallery {
        match view.load {
            LoadState::Loading => {
                let _ = writeln!(out, "Loading more pins...");
            }
            LoadState::Exhausted => {
                let _ = writeln!(out, "No more pins.");
            }
            LoadState::Idle => {}
        }
    }
    out
}
