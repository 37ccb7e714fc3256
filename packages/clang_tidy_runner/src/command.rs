//! The `clang-tidy` command line.

use std::path::Path;

use crate::invoker::Command;

/// Checks enabled for every run
pub const CHECKS: &str = "-checks=-*,clang-analyzer-*,cppcoreguidelines-*,-clang-analyzer-cplusplus-*";

/// Compiler flags passed after `--`
pub const COMPILER_FLAGS: [&str; 8] = [
    "-std=c++1z",
    "-g",
    "-Wall",
    "-Wextra",
    "-Wformat",
    "-Werror",
    "-pedantic",
    "-fms-compatibility-version=19",
];

/// File name suffixes `clang-tidy` is run against
pub const C_FAMILY_EXTENSIONS: [&str; 3] = [".c", ".cpp", ".h"];

/// Builds the `clang-tidy` invocation for `file`.
///
/// The shape is fixed: checks, the file, `--`, the compiler flags, and finally
/// `extra_args` from the settings.
#[must_use]
pub fn clang_tidy_command(executable: &Path, file: &Path, extra_args: &[String]) -> Command {
    Command::new(executable)
        .arg(CHECKS)
        .arg(file.display().to_string())
        .arg("--")
        .args(COMPILER_FLAGS)
        .args(extra_args.iter().cloned())
}

/// Whether `path` has a C/C++ source or header file name
#[must_use]
pub fn is_c_family_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| C_FAMILY_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}
