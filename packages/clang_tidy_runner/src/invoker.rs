//! Running the analysis tool as a child process.
//!
//! [`invoke`] runs a [`Command`] to completion in a given working directory and
//! reports the raw exit code and captured output as an [`InvocationResult`].
//! Deciding what to do with a failed run is left to the caller; see
//! [`InvocationResult::classify`].

use std::{
    fmt,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, ExitStatus, Stdio},
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;

/// Line `clang-tidy` prints on stderr during a normal run
pub const INFORMATIONAL_PREFIX: &str = "Using clang-tidy";

/// Exit code reported when the platform gives neither a code nor a signal
pub const UNKNOWN_EXIT_CODE: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for invocations that never produced a result
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The child process could not be created
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// Waiting on the child process failed
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The child process ran past its deadline and was killed
    #[error("'{program}' did not finish within {timeout:?} and was killed")]
    TimedOut { program: String, timeout: Duration },
}

/// An executable path followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: PathBuf,
    args: Vec<String>,
}

impl Command {
    /// Creates a command for an already resolved executable
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    /// Appends a single argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every argument in order
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The full command line, executable first
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// How a caller should treat a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Clean,
    Failed,
}

/// Exit code and decoded output of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Process exit code, or the negated signal number if the process was
    /// killed by a signal
    pub exit_code: i32,
    pub stdout_text: String,
    pub stderr_text: String,
}

impl InvocationResult {
    fn from_parts(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            exit_code: exit_code(status),
            stdout_text: String::from_utf8_lossy(stdout).into_owned(),
            stderr_text: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// A run is clean only when it exited with `0` and stderr is either empty
    /// or starts with [`INFORMATIONAL_PREFIX`].
    #[must_use]
    pub fn classify(&self) -> Classification {
        let quiet_stderr =
            self.stderr_text.is_empty() || self.stderr_text.starts_with(INFORMATIONAL_PREFIX);

        if self.exit_code == 0 && quiet_stderr {
            Classification::Clean
        } else {
            Classification::Failed
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.classify() == Classification::Clean
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;

        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    UNKNOWN_EXIT_CODE
}

/// Runs `command` in `working_directory` and blocks until it exits.
///
/// There is no timeout: a tool that never exits blocks the caller forever.
/// Use [`invoke_with_timeout`] to bound the run.
///
/// # Errors
///
/// * If the child process cannot be created
pub fn invoke(
    command: &Command,
    working_directory: &Path,
) -> Result<InvocationResult, InvocationError> {
    invoke_with_timeout(command, working_directory, None)
}

/// Runs `command` in `working_directory`, killing it if it is still running
/// after `timeout`.
///
/// The deadline also covers collecting output, so a background process that
/// keeps the tool's pipes open can't hold the call past `timeout`.
///
/// # Errors
///
/// * If the child process cannot be created
/// * If waiting on the child process fails
/// * If the child process does not exit before `timeout`
pub fn invoke_with_timeout(
    command: &Command,
    working_directory: &Path,
    timeout: Option<Duration>,
) -> Result<InvocationResult, InvocationError> {
    let program = command.program.display().to_string();

    let mut process = std::process::Command::new(&command.program);
    process
        .args(&command.args)
        .current_dir(working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("Running `{command}` in {}", working_directory.display());

    let Some(timeout) = timeout else {
        let output = process.output().map_err(|source| InvocationError::Spawn {
            program: program.clone(),
            source,
        })?;

        let result = InvocationResult::from_parts(output.status, &output.stdout, &output.stderr);
        log::debug!("'{program}' exited with {}", result.exit_code);
        return Ok(result);
    };

    let mut child = process.spawn().map_err(|source| InvocationError::Spawn {
        program: program.clone(),
        source,
    })?;

    // Both pipes are drained while polling so a chatty tool can't fill a pipe
    // buffer and stall before the deadline.
    let (sender, receiver) = mpsc::channel();
    if let Some(pipe) = child.stdout.take() {
        drain(Stream::Stdout, pipe, sender.clone());
    }
    if let Some(pipe) = child.stderr.take() {
        drain(Stream::Stderr, pipe, sender.clone());
    }
    drop(sender);
    let deadline = Instant::now() + timeout;

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("'{program}' still running after {timeout:?}, killing it");
                kill_and_reap(&mut child, &program);

                // Reader threads finish on their own once the pipes close
                return Err(InvocationError::TimedOut { program, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                kill_and_reap(&mut child, &program);
                return Err(InvocationError::Wait { program, source });
            }
        }
    };

    // A background process that inherited the pipes can hold them open after
    // the tool itself exits, so the output is collected against the same
    // deadline.
    let mut stdout = vec![];
    let mut stderr = vec![];
    loop {
        match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok((Stream::Stdout, buf)) => stdout = buf,
            Ok((Stream::Stderr, buf)) => stderr = buf,
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "'{program}' exited but its output was still open after {timeout:?}, giving up"
                );
                return Err(InvocationError::TimedOut { program, timeout });
            }
        }
    }

    let result = InvocationResult::from_parts(status, &stdout, &stderr);
    log::debug!("'{program}' exited with {}", result.exit_code);

    Ok(result)
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn drain(
    stream: Stream,
    mut pipe: impl Read + Send + 'static,
    sender: Sender<(Stream, Vec<u8>)>,
) {
    thread::spawn(move || {
        let mut buf = vec![];
        if let Err(e) = pipe.read_to_end(&mut buf) {
            log::warn!("Failed to read child {stream:?}: {e}");
        }
        // The receiver is gone once the caller has given up on the run
        sender.send((stream, buf)).ok();
    });
}

fn kill_and_reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill '{program}': {e}");
    }
    if let Err(e) = child.wait() {
        log::warn!("Failed to reap '{program}': {e}");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn result(exit_code: i32, stderr_text: &str) -> InvocationResult {
        InvocationResult {
            exit_code,
            stdout_text: String::new(),
            stderr_text: stderr_text.to_string(),
        }
    }

    #[test]
    fn classify_clean_on_zero_exit_and_empty_stderr() {
        assert_eq!(result(0, "").classify(), Classification::Clean);
    }

    #[test]
    fn classify_clean_on_informational_stderr() {
        let res = result(0, "Using clang-tidy 17.0.6\n");
        assert_eq!(res.classify(), Classification::Clean);
        assert!(res.is_clean());
    }

    #[test]
    fn classify_failed_on_other_stderr() {
        assert_eq!(
            result(0, "1 warning generated.\n").classify(),
            Classification::Failed
        );
    }

    #[test]
    fn classify_failed_on_nonzero_exit_even_with_informational_stderr() {
        assert_eq!(
            result(1, "Using clang-tidy 17.0.6\n").classify(),
            Classification::Failed
        );
        assert_eq!(result(2, "").classify(), Classification::Failed);
    }

    #[test]
    fn command_argv_puts_program_first() {
        let command = Command::new("/opt/tools/tidybin")
            .arg("--bad-flag")
            .args(["a", "b"]);

        assert_eq!(
            command.argv(),
            vec!["/opt/tools/tidybin", "--bad-flag", "a", "b"]
        );
        assert_eq!(command.to_string(), "/opt/tools/tidybin --bad-flag a b");
        assert_eq!(command.program(), Path::new("/opt/tools/tidybin"));
        assert_eq!(command.get_args(), ["--bad-flag", "a", "b"]);
    }

    #[cfg(unix)]
    mod process {
        use std::fs;

        use pretty_assertions::assert_eq;
        use serial_test::serial;

        use super::super::*;

        fn fake_tool(dir: &Path, body: &str) -> PathBuf {
            use std::os::unix::fs::PermissionsExt as _;

            let path = dir.join("fake-tidy");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test_log::test]
        #[serial]
        fn invoke_reports_exit_code_and_stderr_verbatim() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(
                dir.path(),
                r#"[ "$1" = "--bad-flag" ] && printf 'error: unknown flag' >&2 && exit 2
exit 0"#,
            );

            let res = invoke(&Command::new(tool).arg("--bad-flag"), dir.path()).unwrap();

            assert_eq!(
                res,
                InvocationResult {
                    exit_code: 2,
                    stdout_text: String::new(),
                    stderr_text: "error: unknown flag".to_string(),
                }
            );
            assert_eq!(res.classify(), Classification::Failed);
        }

        #[test_log::test]
        #[serial]
        fn invoke_clean_run() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "echo checked\nexit 0");

            let res = invoke(&Command::new(tool), dir.path()).unwrap();

            assert_eq!(res.exit_code, 0);
            assert_eq!(res.stdout_text, "checked\n");
            assert_eq!(res.stderr_text, "");
            assert_eq!(res.classify(), Classification::Clean);
        }

        #[test_log::test]
        #[serial]
        fn invoke_runs_in_working_directory() {
            let dir = tempfile::tempdir().unwrap();
            let work = dir.path().join("work");
            fs::create_dir_all(&work).unwrap();
            let tool = fake_tool(dir.path(), "pwd -P");

            let res = invoke(&Command::new(tool), &work).unwrap();

            assert_eq!(
                res.stdout_text.trim_end(),
                work.canonicalize().unwrap().display().to_string()
            );
        }

        #[test_log::test]
        #[serial]
        fn invoke_fails_when_program_is_missing() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("vanished");

            let err = invoke(&Command::new(&missing), dir.path()).unwrap_err();

            assert!(matches!(err, InvocationError::Spawn { .. }), "{err:?}");
        }

        #[test_log::test]
        #[serial]
        fn invoke_with_timeout_returns_result_for_fast_tool() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "printf 'Using clang-tidy' >&2\nexit 0");

            let res =
                invoke_with_timeout(&Command::new(tool), dir.path(), Some(Duration::from_secs(30)))
                    .unwrap();

            assert_eq!(res.stderr_text, "Using clang-tidy");
            assert!(res.is_clean());
        }

        #[test_log::test]
        #[serial]
        fn invoke_with_timeout_kills_hung_tool() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "exec sleep 30");
            let started = Instant::now();

            let err = invoke_with_timeout(
                &Command::new(tool),
                dir.path(),
                Some(Duration::from_millis(200)),
            )
            .unwrap_err();

            assert!(matches!(err, InvocationError::TimedOut { .. }), "{err:?}");
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test_log::test]
        #[serial]
        fn invoke_with_timeout_bounds_output_held_by_background_process() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "sleep 5 &\nexit 0");
            let started = Instant::now();

            let err = invoke_with_timeout(
                &Command::new(tool),
                dir.path(),
                Some(Duration::from_millis(300)),
            )
            .unwrap_err();

            assert!(matches!(err, InvocationError::TimedOut { .. }), "{err:?}");
            assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        }

        #[test_log::test]
        #[serial]
        fn invoke_replaces_invalid_utf8_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), r"printf 'a\377b' >&2");

            let res = invoke(&Command::new(tool), dir.path()).unwrap();

            assert_eq!(res.stderr_text, "a\u{FFFD}b");
            assert_eq!(res.classify(), Classification::Failed);
        }

        #[test_log::test]
        #[serial]
        fn invoke_reports_signal_as_negative_exit_code() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "kill -9 $$");

            let res = invoke(&Command::new(tool), dir.path()).unwrap();

            assert_eq!(res.exit_code, -9);
            assert_eq!(res.classify(), Classification::Failed);
        }
    }
}
