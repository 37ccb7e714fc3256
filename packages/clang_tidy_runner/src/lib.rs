#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]
#![forbid(unsafe_code)]

//! # `clang_tidy_runner`
//!
//! Run `clang-tidy` against a C/C++ source file on save (or on demand) and put
//! the editor back the way it was afterwards.
//!
//! # Features
//!
//! *   `cli`: Build the `clang_tidy_runner` binary that drives a run against a
//!     file on disk
//!
//! # Usage
//!
//! 1.  Load [`Settings`] with [`settings::load_settings`] (or use the defaults)
//! 2.  Implement [`Editor`] for the host editor, or use [`FileEditor`]
//! 3.  Call [`ClangTidyCommand::run`] for a manual run, or
//!     [`ClangTidyCommand::on_post_save`] from the editor's save hook
//!
//! The lower level pieces are usable on their own: [`resolver::resolve`] finds
//! an executable on `PATH`, and [`invoker::invoke`] runs a [`Command`] and
//! reports its exit code and stderr.

pub mod command;
pub mod editor;
pub mod invoker;
pub mod resolver;
pub mod runner;
pub mod settings;

pub use command::{clang_tidy_command, is_c_family_file};
pub use editor::{Editor, FileEditor, ViewState};
pub use invoker::{Classification, Command, InvocationError, InvocationResult};
pub use runner::{ClangTidyCommand, Error, RunOutcome, SkipReason};
pub use settings::Settings;
