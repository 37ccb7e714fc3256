//! The `clang_tidy` editor command and its post-save hook.

use std::path::Path;

use thiserror::Error;

use crate::{
    command::{clang_tidy_command, is_c_family_file},
    editor::Editor,
    invoker::{self, Classification, InvocationError, InvocationResult},
    resolver,
    settings::Settings,
};

/// Message shown when a run fails and `show_errors` is enabled
pub const FAILED_MESSAGE: &str =
    "Clang Tidy: clang-tidy process call failed. See log for details.";

/// Error type for a run that did not complete cleanly
#[derive(Debug, Error)]
pub enum Error {
    /// The configured executable could not be resolved
    #[error("Clang Tidy: can not find {0} in path.")]
    ExecutableNotFound(String),
    /// The tool could not be started or did not finish
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    /// The tool ran but reported a failure
    #[error("Clang Tidy: clang-tidy exited with {}", .0.exit_code)]
    ToolFailure(InvocationResult),
}

/// Why a run did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The buffer is not backed by a file
    NoFile,
    /// The file is not a C/C++ source or header
    NotCFamilyFile,
    /// The buffer is empty
    EmptyBuffer,
    /// A save happened but `run_on_save` is off
    RunOnSaveDisabled,
}

/// Result of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Clean(InvocationResult),
}

/// Runs `clang-tidy` against the file behind an [`Editor`] buffer
#[derive(Debug, Clone, Default)]
pub struct ClangTidyCommand {
    settings: Settings,
}

impl ClangTidyCommand {
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Hook for the editor's post-save event. Runs only when `run_on_save` is
    /// enabled.
    ///
    /// # Errors
    ///
    /// * See [`Self::run`]
    pub fn on_post_save(&self, editor: &mut dyn Editor) -> Result<RunOutcome, Error> {
        if !self.settings.run_on_save {
            log::trace!("run_on_save is disabled, ignoring save");
            return Ok(RunOutcome::Skipped(SkipReason::RunOnSaveDisabled));
        }

        self.run(editor)
    }

    /// Runs `clang-tidy` on the editor's file and restores the view
    /// afterwards.
    ///
    /// If the run fails, the buffer is put back to the text it had before the
    /// run.
    ///
    /// # Errors
    ///
    /// * If the configured executable cannot be found
    /// * If the tool cannot be started or times out
    /// * If the tool exits nonzero or writes anything unexpected to stderr
    pub fn run(&self, editor: &mut dyn Editor) -> Result<RunOutcome, Error> {
        let Some(file) = editor.file_name() else {
            return Ok(RunOutcome::Skipped(SkipReason::NoFile));
        };
        if !is_c_family_file(&file) {
            log::debug!("Skipping {}, not a C/C++ file", file.display());
            return Ok(RunOutcome::Skipped(SkipReason::NotCFamilyFile));
        }

        let buffer_text = editor.buffer_text();
        if buffer_text.is_empty() {
            log::debug!("Skipping {}, buffer is empty", file.display());
            return Ok(RunOutcome::Skipped(SkipReason::EmptyBuffer));
        }

        let name = &self.settings.clang_tidy;
        let Some(executable) = resolver::resolve(name) else {
            let err = Error::ExecutableNotFound(name.clone());
            editor.error_message(&err.to_string());
            return Err(err);
        };

        let command = clang_tidy_command(&executable, &file, &self.settings.args);
        let cwd = working_directory(&file);
        let view_state = editor.view_state();

        let result = match invoker::invoke_with_timeout(&command, cwd, self.settings.timeout()) {
            Ok(result) => result,
            Err(e) => {
                log::error!("{e}");
                editor.error_message(&format!("Clang Tidy: {e}"));
                editor.restore_view_state(&view_state);
                return Err(e.into());
            }
        };

        let classification = result.classify();

        if classification == Classification::Failed {
            editor.replace_buffer(&buffer_text);
            log::error!(
                "failed: exit_code: {}\n{}",
                result.exit_code,
                result.stderr_text
            );
            if self.settings.show_errors {
                editor.error_message(FAILED_MESSAGE);
            }
        }

        editor.reload_all_files();
        editor.restore_view_state(&view_state);

        match classification {
            Classification::Clean => {
                log::info!("clang-tidy passed for {}", file.display());
                Ok(RunOutcome::Clean(result))
            }
            Classification::Failed => Err(Error::ToolFailure(result)),
        }
    }
}

/// The tool runs in the file's directory, or `.` for a bare file name
fn working_directory(file: &Path) -> &Path {
    file.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
