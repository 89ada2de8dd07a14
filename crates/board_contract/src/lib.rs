//! Shared contract types between the canvas window-manager runtime and remote
//! board-store adapters.
//!
//! Everything here is a plain data shape: identifiers, window geometry, the
//! persisted window record, desktop-icon placements, and the wire payloads
//! exchanged with the remote store. Service traits live in `platform_remote`;
//! state machines live in `canvas_runtime`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use serde::{Deserialize, Serialize};

/// Minimum managed window width in pixels.
pub const MIN_WINDOW_WIDTH: i32 = 200;
/// Minimum managed window height in pixels.
pub const MIN_WINDOW_HEIGHT: i32 = 150;
/// Default size for windows created from the desktop menu.
pub const DEFAULT_WINDOW_SIZE: WindowSize = WindowSize {
    width: 300,
    height: 200,
};
/// Default size for windows created by dropping a file onto the canvas.
pub const DROPPED_WINDOW_SIZE: WindowSize = WindowSize {
    width: 400,
    height: 300,
};

/// Stable identifier for a board, the unit of save/load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    /// Returns a board identifier when `raw` is non-empty and path-safe.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if is_valid_board_id(&raw) {
            Ok(Self(raw))
        } else {
            Err(format!(
                "invalid board id `{raw}`; expected a non-empty path-safe token"
            ))
        }
    }

    /// Creates an id without validation for trusted constants and adapters.
    pub fn trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the string form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid_board_id(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > 120 {
        return false;
    }
    raw.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
}

/// Stable identifier for a window, assigned by the remote store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    /// Wraps a remote-assigned identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the string form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Content kind of a window. Immutable after creation except through an
/// explicit type-changing upload.
pub enum WindowKind {
    /// Inline-edited text/markdown content.
    Text,
    /// Uploaded image media.
    Image,
    /// Uploaded video media.
    Video,
    /// Uploaded audio media.
    Audio,
    /// Uploaded PDF document.
    Pdf,
    /// Converted office/document upload.
    Document,
}

impl WindowKind {
    /// Stable string token used on the wire and in diagnostics.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Pdf => "pdf",
            Self::Document => "document",
        }
    }

    /// Display name used when composing default window titles.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Text => "文本",
            Self::Image => "图片",
            Self::Video => "视频",
            Self::Audio => "音频",
            Self::Pdf => "PDF",
            Self::Document => "文档",
        }
    }

    /// Upload category directory used by the remote store.
    pub const fn media_category(self) -> &'static str {
        match self {
            Self::Text => "files",
            Self::Image => "images",
            Self::Video => "videos",
            Self::Audio => "audios",
            Self::Pdf => "pdfs",
            Self::Document => "documents",
        }
    }

    /// Classifies a file name into a window kind by its extension.
    ///
    /// Unrecognized extensions fall back to [`WindowKind::Text`].
    pub fn for_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" => Self::Image,
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" | "mkv" | "m4v" => Self::Video,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" => Self::Audio,
            "pdf" => Self::Pdf,
            "doc" | "docx" | "ppt" | "pptx" | "xls" | "xlsx" => Self::Document,
            _ => Self::Text,
        }
    }
}

/// Returns the file name without its final extension.
///
/// A leading dot is not treated as an extension separator.
pub fn file_base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Top-left pixel coordinate of a window or icon.
pub struct WindowPosition {
    /// Horizontal offset from the canvas origin.
    pub x: i32,
    /// Vertical offset from the canvas origin.
    pub y: i32,
}

impl WindowPosition {
    /// Returns the position translated by the given deltas.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Clamps both coordinates to the non-negative canvas quadrant.
    pub fn clamped_origin(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
        }
    }
}

impl Default for WindowPosition {
    fn default() -> Self {
        Self { x: 100, y: 100 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Pixel size of a window.
pub struct WindowSize {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl WindowSize {
    /// Clamps the size to the managed minimum floor.
    pub fn clamped_min(self) -> Self {
        Self {
            width: self.width.max(MIN_WINDOW_WIDTH),
            height: self.height.max(MIN_WINDOW_HEIGHT),
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        DEFAULT_WINDOW_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Pointer coordinate in canvas space.
pub struct PointerPosition {
    /// Horizontal pointer coordinate.
    pub x: i32,
    /// Vertical pointer coordinate.
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A cell in the desktop's icon placement lattice.
pub struct GridCell {
    /// Column index, zero-based from the left margin.
    #[serde(rename = "gridX")]
    pub grid_x: i32,
    /// Row index, zero-based from the top margin.
    #[serde(rename = "gridY")]
    pub grid_y: i32,
}

impl GridCell {
    /// The degenerate fallback cell used when the grid is exhausted.
    pub const ORIGIN: Self = Self {
        grid_x: 0,
        grid_y: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted placement of one desktop icon.
///
/// The pixel position is authoritative for rendering; the grid cell is
/// authoritative for collision avoidance.
pub struct IconPlacement {
    /// Rendered top-left pixel position.
    pub position: WindowPosition,
    /// Occupied placement-lattice cell.
    #[serde(rename = "gridPosition")]
    pub grid: GridCell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Persisted window record, the unit of every full-object remote write.
pub struct WindowRecord {
    /// Remote-assigned identifier.
    pub id: WindowId,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: WindowKind,
    /// Display title, unique case-insensitively per board.
    pub title: String,
    /// Inline text or an opaque uploaded-media reference.
    pub content: String,
    /// Board-relative media path (`files/<name>`) when media was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Top-left pixel position; both coordinates are non-negative.
    pub position: WindowPosition,
    /// Pixel size, floored at the managed minimum.
    pub size: WindowSize,
    /// Closed-to-tray flag. A hidden window is not deleted.
    #[serde(default)]
    pub hidden: bool,
    /// Monotonic unix-millisecond stamp applied on save.
    #[serde(default)]
    pub updated_at_unix_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Request payload for creating a window on the remote store.
pub struct CreateWindowRequest {
    /// Content kind of the new window.
    #[serde(rename = "type")]
    pub kind: WindowKind,
    /// Title, already made unique by the caller.
    pub title: String,
    /// Initial content, usually empty.
    pub content: String,
    /// Initial top-left position.
    pub position: WindowPosition,
    /// Initial size.
    pub size: WindowSize,
}

#[derive(Debug, Clone, PartialEq)]
/// Binary upload request for a window.
pub struct UploadRequest {
    /// Original client file name, used for naming and classification.
    pub file_name: String,
    /// Raw file bytes; the transport is a collaborator concern.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Remote store response to a window upload.
pub struct UploadOutcome {
    /// Window kind after the upload, possibly changed by the store.
    #[serde(rename = "window_type")]
    pub kind: WindowKind,
    /// Store-chosen title (the uploaded file's base name).
    #[serde(rename = "filename")]
    pub title: String,
    /// Board-relative media path.
    pub file_path: Option<String>,
    /// Content reference when the store serves the upload directly.
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Inbound watcher-style notification about remote board changes.
pub struct BoardEvent {
    /// Board the notification applies to.
    pub board_id: BoardId,
    /// Notification payload.
    #[serde(flatten)]
    pub kind: BoardEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Kinds of watcher notification the canvas core reacts to.
pub enum BoardEventKind {
    /// The board's window set changed remotely; reload unless suppressed.
    ReloadWindows,
    /// A single window was deleted remotely.
    WindowDeleted {
        /// Identifier of the deleted window.
        window_id: WindowId,
    },
}
