#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]
#![forbid(unsafe_code)]

//! Command-line interface for running clang-tidy against a single file
//!
//! Drives the same command an editor would, using the file on disk as the
//! buffer. Settings are read from `~/.local/clang_tidy_runner/ClangTidy.sublime-settings`
//! unless `--settings` points elsewhere.
//!
//! # Usage
//!
//! Run clang-tidy on a file:
//! ```bash
//! clang_tidy_runner src/main.cpp
//! ```
//!
//! Use a specific binary and pass extra compiler flags:
//! ```bash
//! clang_tidy_runner --clang-tidy /opt/llvm/bin/clang-tidy src/main.cpp -- -I include
//! ```
//!
//! Behave like the post-save hook (no-op unless `run_on_save` is enabled):
//! ```bash
//! clang_tidy_runner --on-save src/main.cpp
//! ```

use std::{path::PathBuf, process};

use clap::Parser;
use clang_tidy_runner::{
    ClangTidyCommand, Error, FileEditor, RunOutcome,
    settings::{self, Settings},
};

const EXIT_NOT_FOUND: i32 = 127;
const EXIT_CANNOT_INVOKE: i32 = 126;
const EXIT_USAGE: i32 = 2;

/// Run clang-tidy on a C/C++ file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File to analyze
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Program name or path of clang-tidy, overriding the settings
    #[arg(long = "clang-tidy", value_name = "BIN")]
    clang_tidy: Option<String>,

    /// Act as the post-save hook (only runs when `run_on_save` is enabled)
    #[arg(long)]
    on_save: bool,

    /// Kill clang-tidy after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Don't report failures as errors, only log them
    #[arg(long)]
    no_show_errors: bool,

    /// Extra arguments appended after the configured ones
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(clang_tidy) = &self.clang_tidy {
            settings.clang_tidy.clone_from(clang_tidy);
        }
        if self.timeout.is_some() {
            settings.timeout_secs = self.timeout;
        }
        if self.no_show_errors {
            settings.show_errors = false;
        }
        settings.args.extend(self.args.iter().cloned());
        settings
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or(
                "CLANG_TIDY_RUNNER_LOG",
                std::env::var("RUST_LOG").unwrap_or_else(|_| "clang_tidy_runner=info".into()),
            )
            .write_style("CLANG_TIDY_RUNNER_LOG_STYLE"),
    )
    .init();

    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => settings::load_settings(path),
        None => settings::load_default_settings(),
    };
    let settings = match loaded {
        Ok(settings) => cli.apply(settings),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_USAGE);
        }
    };

    let file = cli.file.canonicalize().unwrap_or_else(|_| cli.file.clone());
    let mut editor = match FileEditor::open(&file) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error: Failed to open {}: {e}", file.display());
            process::exit(EXIT_USAGE);
        }
    };

    let command = ClangTidyCommand::new(settings);
    let outcome = if cli.on_save {
        command.on_post_save(&mut editor)
    } else {
        command.run(&mut editor)
    };

    match outcome {
        Ok(RunOutcome::Clean(result)) => {
            print!("{}", result.stdout_text);
        }
        Ok(RunOutcome::Skipped(reason)) => {
            log::info!("Nothing to do for {}: {reason:?}", file.display());
        }
        Err(Error::ToolFailure(result)) => {
            print!("{}", result.stdout_text);
            eprint!("{}", result.stderr_text);
            process::exit(if result.exit_code > 0 {
                result.exit_code
            } else {
                1
            });
        }
        Err(e @ Error::ExecutableNotFound(_)) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_NOT_FOUND);
        }
        Err(e @ Error::Invocation(_)) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_CANNOT_INVOKE);
        }
    }
}
