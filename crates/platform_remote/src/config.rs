//! Remote endpoint configuration and content-reference resolution.

use board_contract::{BoardId, WindowRecord};

/// Base-URL configuration for the remote board store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Origin of the board-store API, without a trailing slash.
    pub api_base: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8081".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Creates a configuration for a custom API origin.
    pub fn new(api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        while api_base.ends_with('/') {
            api_base.pop();
        }
        Self { api_base }
    }

    /// Rewrites a legacy relative `/api/` content reference to an absolute
    /// URL, or returns `None` when `content` needs no migration.
    pub fn absolute_content_url(&self, content: &str) -> Option<String> {
        if content.starts_with("/api/") {
            Some(format!("{}{}", self.api_base, content))
        } else {
            None
        }
    }

    /// URL that serves a board-relative media path.
    pub fn file_serve_url(&self, board: &BoardId, path: &str) -> String {
        format!(
            "{}/api/boards/{}/files/serve?path={}",
            self.api_base, board, path
        )
    }

    /// Resolves the media reference of a window to a fetchable URL.
    ///
    /// The board-relative `file_path` wins over `content`; a `content` value
    /// that is already absolute is passed through; relative references are
    /// routed through the file-serve endpoint. Windows without uploaded media
    /// resolve to `None`.
    pub fn media_url(&self, board: &BoardId, record: &WindowRecord) -> Option<String> {
        if let Some(path) = record.file_path.as_deref() {
            if path.starts_with("files/") {
                return Some(self.file_serve_url(board, path));
            }
        }

        let content = record.content.as_str();
        if content.starts_with("http://") || content.starts_with("https://") {
            return Some(content.to_string());
        }
        if let Some(absolute) = self.absolute_content_url(content) {
            return Some(absolute);
        }
        if content.contains('/') || content.contains('\\') {
            return Some(self.file_serve_url(board, content));
        }
        None
    }
}
