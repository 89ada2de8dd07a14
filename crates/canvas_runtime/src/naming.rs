//! Window-title uniqueness.
//!
//! Titles double as remote file names, so the board enforces uniqueness by
//! generating an unused name instead of rejecting the request.

use std::collections::HashSet;

use board_contract::{WindowId, WindowKind};

use crate::model::CanvasWindow;

/// Returns `base` when it is unused (case-insensitively) among `windows`,
/// otherwise the first free `base(1)`, `base(2)`, … candidate.
///
/// `exclude` skips the window being renamed so committing its current title
/// does not collide with itself.
pub fn unique_window_title(
    base: &str,
    windows: &[CanvasWindow],
    exclude: Option<&WindowId>,
) -> String {
    let taken: HashSet<String> = windows
        .iter()
        .filter(|w| exclude != Some(w.id()))
        .map(|w| w.record.title.to_lowercase())
        .collect();

    if !taken.contains(&base.to_lowercase()) {
        return base.to_string();
    }

    let mut counter = 1usize;
    loop {
        let candidate = format!("{base}({counter})");
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Default title for a newly created window of `kind`, e.g. `新建文本`.
pub fn default_window_title(kind: WindowKind, windows: &[CanvasWindow]) -> String {
    unique_window_title(&format!("新建{}", kind.display_name()), windows, None)
}

#[cfg(test)]
mod tests {
    use board_contract::{WindowPosition, WindowRecord, WindowSize};
    use pretty_assertions::assert_eq;

    use super::*;

    fn windows(titles: &[&str]) -> Vec<CanvasWindow> {
        titles
            .iter()
            .enumerate()
            .map(|(index, title)| {
                CanvasWindow::from_record(WindowRecord {
                    id: WindowId::new(format!("window-{index}")),
                    kind: WindowKind::Text,
                    title: title.to_string(),
                    content: String::new(),
                    file_path: None,
                    position: WindowPosition::default(),
                    size: WindowSize::default(),
                    hidden: false,
                    updated_at_unix_ms: 0,
                })
            })
            .collect()
    }

    #[test]
    fn unused_base_names_pass_through_verbatim() {
        assert_eq!(
            unique_window_title("新建文本", &windows(&[]), None),
            "新建文本"
        );
    }

    #[test]
    fn collisions_append_increasing_counters() {
        let existing = windows(&["新建文本", "新建文本(1)"]);
        assert_eq!(
            unique_window_title("新建文本", &existing, None),
            "新建文本(2)"
        );
    }

    #[test]
    fn uniqueness_is_case_insensitive() {
        let existing = windows(&["Lecture Notes"]);
        assert_eq!(
            unique_window_title("lecture notes", &existing, None),
            "lecture notes(1)"
        );
    }

    #[test]
    fn renaming_a_window_to_its_own_title_does_not_collide() {
        let existing = windows(&["草稿", "其他"]);
        let own_id = WindowId::new("window-0");
        assert_eq!(
            unique_window_title("草稿", &existing, Some(&own_id)),
            "草稿"
        );
    }

    #[test]
    fn default_titles_follow_the_kind_display_name() {
        let existing = windows(&["新建图片"]);
        assert_eq!(
            default_window_title(WindowKind::Image, &existing),
            "新建图片(1)"
        );
        assert_eq!(default_window_title(WindowKind::Pdf, &existing), "新建PDF");
    }
}
