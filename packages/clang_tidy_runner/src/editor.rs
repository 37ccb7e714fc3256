//! The editor side of a run.
//!
//! A run needs a handful of things from the host editor: the file being
//! edited, its buffer, a way to put the buffer and the view back, and a way to
//! tell the user something went wrong. [`Editor`] is that surface.
//! [`FileEditor`] implements it for a plain file on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Cursor/selection regions and scroll position of a view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Selected regions as `(anchor, caret)` offsets
    pub selections: Vec<(usize, usize)>,
    /// Scroll position of the view
    pub viewport_position: (f64, f64),
}

/// Host editor operations used by a run
pub trait Editor {
    /// Path of the file backing the current buffer, if it has one
    fn file_name(&self) -> Option<PathBuf>;

    /// Full text of the current buffer
    fn buffer_text(&self) -> String;

    /// Replaces the full text of the current buffer
    fn replace_buffer(&mut self, text: &str);

    /// Captures the current selections and scroll position
    fn view_state(&self) -> ViewState;

    /// Puts selections and scroll position back.
    ///
    /// Implementations scroll to the origin before scrolling to the saved
    /// position, then replace the selection with the saved regions.
    fn restore_view_state(&mut self, state: &ViewState);

    /// Reloads every open file from disk
    fn reload_all_files(&mut self);

    /// Shows a blocking error message to the user
    fn error_message(&mut self, message: &str);
}

/// [`Editor`] over a single file on disk.
///
/// The buffer is the file contents, replacing it writes the file back, and
/// error messages are logged and kept so callers can report them.
#[derive(Debug)]
pub struct FileEditor {
    path: PathBuf,
    text: String,
    view: ViewState,
    messages: Vec<String>,
}

impl FileEditor {
    /// Opens `path` and reads its contents into the buffer
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;

        Ok(Self {
            path,
            text,
            view: ViewState::default(),
            messages: vec![],
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Error messages shown so far
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Editor for FileEditor {
    fn file_name(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn buffer_text(&self) -> String {
        self.text.clone()
    }

    fn replace_buffer(&mut self, text: &str) {
        if self.text == text {
            return;
        }

        self.text = text.to_string();

        if let Err(e) = fs::write(&self.path, text) {
            log::error!("Failed to write {}: {e}", self.path.display());
        }
    }

    fn view_state(&self) -> ViewState {
        self.view.clone()
    }

    fn restore_view_state(&mut self, state: &ViewState) {
        self.view = state.clone();
    }

    fn reload_all_files(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(text) => self.text = text,
            Err(e) => log::warn!("Failed to reload {}: {e}", self.path.display()),
        }
    }

    fn error_message(&mut self, message: &str) {
        log::error!("{message}");
        self.messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn open_reads_buffer_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "int main(void) { return 0; }\n").unwrap();

        let editor = FileEditor::open(&path).unwrap();

        assert_eq!(editor.file_name(), Some(path.clone()));
        assert_eq!(editor.path(), path.as_path());
        assert_eq!(editor.buffer_text(), "int main(void) { return 0; }\n");
    }

    #[test_log::test]
    fn open_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(FileEditor::open(dir.path().join("missing.c")).is_err());
    }

    #[test_log::test]
    fn replace_buffer_writes_changed_text_and_reload_picks_up_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "before\n").unwrap();
        let mut editor = FileEditor::open(&path).unwrap();

        editor.replace_buffer("after\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");

        fs::write(&path, "external\n").unwrap();
        editor.reload_all_files();
        assert_eq!(editor.buffer_text(), "external\n");
    }

    #[test_log::test]
    fn view_state_round_trips_and_messages_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "x\n").unwrap();
        let mut editor = FileEditor::open(&path).unwrap();
        let state = ViewState {
            selections: vec![(1, 4), (10, 10)],
            viewport_position: (0.0, 120.5),
        };

        editor.restore_view_state(&state);
        editor.error_message("Clang Tidy: oops");

        assert_eq!(editor.view_state(), state);
        assert_eq!(editor.messages(), ["Clang Tidy: oops"]);
    }
}
