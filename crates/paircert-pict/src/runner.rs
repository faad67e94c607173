//! Child-process execution of the generator with a wall-clock budget.

use std::io::{Read, Write as _};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Bound on the stderr excerpt attached to generator failures.
pub const STDERR_TAIL_BYTES: usize = 2048;

/// Interval between SIGTERM and the forced kill.
const TERMINATE_GRACE: Duration = Duration::from_millis(300);
/// Polling interval while waiting on the child.
const WAIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum PictError {
    #[error("failed to stage the model file for the generator: {0}")]
    Stage(#[source] std::io::Error),
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("generator exited with {status}: {stderr_tail}")]
    Failed {
        status: String,
        stderr_tail: String,
    },
    #[error("generator exited cleanly but produced no output")]
    EmptyOutput,
    #[error("generator exceeded its {timeout_secs:.3}s budget")]
    Timeout { timeout_secs: f64 },
    #[error("generator I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single generator attempt produced no suite. The driver folds this
/// into the attempt record; it is deliberately coarser than [`PictError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorFailure {
    /// Wall-clock budget exceeded; the child was terminated, no partial rows.
    Timeout,
    /// Anything else: spawn failure, non-zero exit, empty or malformed output.
    Failed { message: String },
}

/// One generator capable of producing a raw TSV suite for a model.
///
/// The production implementation drives PICT; tests substitute scripted
/// generators to exercise the search loop without a binary.
pub trait SuiteGenerator {
    fn generate(
        &mut self,
        model_text: &str,
        strength: u32,
        seed: u64,
        timeout: Duration,
    ) -> Result<String, GeneratorFailure>;
}

/// Runs the real PICT binary.
#[derive(Debug, Clone)]
pub struct PictRunner {
    binary: PathBuf,
}

impl PictRunner {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    /// Execute one generation run and return raw stdout.
    ///
    /// The model is staged to a temporary file that is removed on every exit
    /// path. On timeout the child receives a graceful terminate, then a kill
    /// after [`TERMINATE_GRACE`]; no partial output is returned.
    pub fn run(
        &self,
        model_text: &str,
        strength: u32,
        seed: u64,
        timeout: Duration,
    ) -> Result<String, PictError> {
        let mut model_file = tempfile::Builder::new()
            .prefix("paircert-model-")
            .suffix(".pict")
            .tempfile()
            .map_err(PictError::Stage)?;
        model_file
            .write_all(model_text.as_bytes())
            .and_then(|()| model_file.flush())
            .map_err(PictError::Stage)?;

        let mut command = Command::new(&self.binary);
        command.arg(model_file.path());
        if strength != 2 {
            command.arg(format!("/o:{strength}"));
        }
        command.arg(format!("/r:{seed}"));
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so terminate() can reach any helper the
        // generator forks and the pipes always close.
        #[cfg(unix)]
        command.process_group(0);

        debug!(
            binary = %self.binary.display(),
            seed,
            strength,
            timeout_ms = timeout.as_millis() as u64,
            "spawning generator"
        );

        let mut child = command.spawn().map_err(|source| PictError::Spawn {
            command: self.binary.display().to_string(),
            source,
        })?;

        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = match wait_with_deadline(&mut child, Instant::now() + timeout)? {
            Some(status) => status,
            None => {
                terminate(&mut child);
                // Pipes are closed now; collect and discard.
                let _ = join_reader(stdout_reader);
                let _ = join_reader(stderr_reader);
                return Err(PictError::Timeout {
                    timeout_secs: timeout.as_secs_f64(),
                });
            }
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        if !status.success() {
            return Err(PictError::Failed {
                status: describe_status(status),
                stderr_tail: stderr_tail(&stderr),
            });
        }
        if stdout.trim().is_empty() {
            return Err(PictError::EmptyOutput);
        }
        Ok(stdout)
    }
}

impl SuiteGenerator for PictRunner {
    fn generate(
        &mut self,
        model_text: &str,
        strength: u32,
        seed: u64,
        timeout: Duration,
    ) -> Result<String, GeneratorFailure> {
        self.run(model_text, strength, seed, timeout)
            .map_err(|error| match error {
                PictError::Timeout { .. } => GeneratorFailure::Timeout,
                other => GeneratorFailure::Failed {
                    message: other.to_string(),
                },
            })
    }
}

fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Wait until the child exits or the deadline passes. `None` means deadline.
fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
) -> Result<Option<ExitStatus>, PictError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL);
    }
}

/// Graceful terminate, short grace window, then force-kill.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let group = -(child.id() as libc::pid_t);
    unsafe {
        libc::kill(group, libc::SIGTERM);
    }
    let grace_deadline = Instant::now() + TERMINATE_GRACE;
    while Instant::now() < grace_deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            unsafe {
                libc::kill(group, libc::SIGKILL);
            }
            return;
        }
        thread::sleep(WAIT_POLL);
    }
    unsafe {
        libc::kill(group, libc::SIGKILL);
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Last [`STDERR_TAIL_BYTES`] of stderr, kept on a char boundary.
fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - STDERR_TAIL_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_short_text_verbatim() {
        assert_eq!(stderr_tail("  model error\n"), "model error");
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let long = "x".repeat(STDERR_TAIL_BYTES * 3);
        assert_eq!(stderr_tail(&long).len(), STDERR_TAIL_BYTES);
    }

    #[test]
    fn stderr_tail_respects_char_boundaries() {
        let long = "é".repeat(STDERR_TAIL_BYTES);
        let tail = stderr_tail(&long);
        assert!(tail.len() <= STDERR_TAIL_BYTES);
        assert!(tail.chars().all(|c| c == 'é'));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn fake_generator(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-pict");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            let mut perms = fs::metadata(&path).expect("stat").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("chmod");
            path
        }

        #[test]
        fn captures_stdout_on_success() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_generator(
                dir.path(),
                "printf 'A\\tB\\na1\\tb1\\n'",
            );
            let runner = PictRunner::new(script);
            let out = runner
                .run("A: a1, a2\nB: b1, b2\n", 2, 0, Duration::from_secs(5))
                .expect("run should succeed");
            assert_eq!(out, "A\tB\na1\tb1\n");
        }

        #[test]
        fn nonzero_exit_carries_stderr_tail() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_generator(dir.path(), "echo 'bad model' >&2; exit 3");
            let runner = PictRunner::new(script);
            let err = runner
                .run("A: a1\nB: b1\n", 2, 0, Duration::from_secs(5))
                .unwrap_err();
            match err {
                PictError::Failed {
                    status,
                    stderr_tail,
                } => {
                    assert_eq!(status, "code 3");
                    assert_eq!(stderr_tail, "bad model");
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[test]
        fn clean_exit_with_no_output_is_a_contract_violation() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_generator(dir.path(), "exit 0");
            let runner = PictRunner::new(script);
            let err = runner
                .run("A: a1\nB: b1\n", 2, 0, Duration::from_secs(5))
                .unwrap_err();
            assert!(matches!(err, PictError::EmptyOutput));
        }

        #[test]
        fn slow_generator_times_out_without_partial_rows() {
            let dir = tempfile::tempdir().expect("tempdir");
            let script = fake_generator(dir.path(), "printf 'A\\tB\\n'; sleep 10");
            let runner = PictRunner::new(script);
            let started = Instant::now();
            let err = runner
                .run("A: a1\nB: b1\n", 2, 0, Duration::from_millis(150))
                .unwrap_err();
            assert!(matches!(err, PictError::Timeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn seed_flag_is_forwarded() {
            let dir = tempfile::tempdir().expect("tempdir");
            // Echo the arguments back so the contract is observable.
            let script = fake_generator(dir.path(), "printf '%s\\n' \"$@\"");
            let runner = PictRunner::new(script);
            let out = runner
                .run("A: a1, a2\nB: b1, b2\n", 2, 42, Duration::from_secs(5))
                .expect("run should succeed");
            assert!(out.contains("/r:42"));
            assert!(!out.contains("/o:"));

            let out = runner
                .run("A: a1, a2\nB: b1, b2\n", 3, 7, Duration::from_secs(5))
                .expect("run should succeed");
            assert!(out.contains("/o:3"));
            assert!(out.contains("/r:7"));
        }
    }
}
