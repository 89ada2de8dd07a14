//! Desktop-icon synchronizer.
//!
//! Every window owns exactly one desktop icon. The synchronizer re-derives
//! the icon list after window-set changes while keeping manually placed
//! icons where the user left them; only windows without an icon get a fresh
//! lattice cell.

use std::collections::HashMap;

use board_contract::{BoardId, GridCell, WindowId, WindowKind, WindowPosition, WindowRecord};
use platform_remote::RemoteConfig;

use crate::grid::GridAllocator;
use crate::model::{CanvasState, CanvasWindow, DesktopIcon, IconThumbnail};

/// Identity/visibility fingerprint of the derived icon set. The sync pass is
/// skipped while this is unchanged so pure geometry actions do not rebuild
/// icons or re-trigger renders.
pub(crate) fn fingerprint(windows: &[CanvasWindow]) -> Vec<(WindowId, bool)> {
    windows
        .iter()
        .map(|w| (w.id().clone(), w.record.hidden))
        .collect()
}

/// Re-derives `state.icons` from `state.windows`.
///
/// Existing icons keep their pixel position and lattice cell; new windows
/// allocate the next free cell; icons whose window disappeared are dropped.
/// The grid occupancy set is rebuilt from the result.
pub(crate) fn sync_icons(state: &mut CanvasState) {
    let fingerprint = fingerprint(&state.windows);
    if fingerprint == state.icon_fingerprint {
        tracing::debug!("icon set unchanged; skipping desktop icon sync");
        return;
    }

    let board = state.board_id.clone();
    let media = state.media.clone();
    let existing: HashMap<WindowId, (WindowPosition, GridCell)> = state
        .icons
        .iter()
        .map(|icon| (icon.window_id.clone(), (icon.position, icon.grid)))
        .collect();

    state.grid.clear();
    let mut icons = Vec::with_capacity(state.windows.len());
    for window in &state.windows {
        let (position, cell) = match existing.get(window.id()) {
            Some((position, cell)) => {
                state.grid.claim(*cell);
                (*position, *cell)
            }
            None => {
                let cell = state.grid.next_free_cell();
                (GridAllocator::cell_to_pixel(cell), cell)
            }
        };
        icons.push(make_icon(window, position, cell, board.as_ref(), &media));
    }

    state.icons = icons;
    state.icon_fingerprint = fingerprint;
}

pub(crate) fn make_icon(
    window: &CanvasWindow,
    position: WindowPosition,
    cell: GridCell,
    board: Option<&BoardId>,
    media: &RemoteConfig,
) -> DesktopIcon {
    DesktopIcon {
        window_id: window.id().clone(),
        title: window.record.title.clone(),
        kind: window.record.kind,
        position,
        grid: cell,
        thumbnail: thumbnail_for(&window.record, board, media),
        hidden: window.record.hidden,
    }
}

/// Derives the icon thumbnail: uploaded images resolve to their media URL,
/// everything else shows a kind glyph that distinguishes empty placeholders
/// from windows with uploaded content.
pub(crate) fn thumbnail_for(
    record: &WindowRecord,
    board: Option<&BoardId>,
    media: &RemoteConfig,
) -> IconThumbnail {
    let has_media = has_uploaded_media(record);
    match record.kind {
        WindowKind::Text => IconThumbnail::Emoji("📝"),
        WindowKind::Image => {
            if has_media {
                if let Some(url) = board.and_then(|board| media.media_url(board, record)) {
                    return IconThumbnail::MediaUrl(url);
                }
            }
            IconThumbnail::Emoji("🖼️")
        }
        WindowKind::Video => IconThumbnail::Emoji(if has_media { "🎬" } else { "🎥" }),
        WindowKind::Audio => IconThumbnail::Emoji(if has_media { "🎼" } else { "🎵" }),
        WindowKind::Pdf => IconThumbnail::Emoji(if has_media { "📑" } else { "📄" }),
        WindowKind::Document => IconThumbnail::Emoji("🪟"),
    }
}

/// Whether the window references uploaded media rather than an empty
/// placeholder file.
fn has_uploaded_media(record: &WindowRecord) -> bool {
    let content = record.content.as_str();
    if content.contains("http")
        || content.contains("/api/boards/")
        || content.contains('\\')
        || content.contains('/')
    {
        return true;
    }

    if let Some(path) = record.file_path.as_deref() {
        if let Some(name) = path.strip_prefix("files/") {
            if !name.starts_with("新建") && !name.starts_with("untitled") {
                return true;
            }
            if !content.trim().is_empty() {
                return true;
            }
        }
    }
    false
}
