//! Invocation of the external document renderer.
//!
//! The enriched record is passed as a single JSON argument:
//!
//! ```text
//! <program> <args...> --data <json> --output <path>
//! ```
//!
//! A zero exit status is success. The call is bounded by a timeout and can be
//! cancelled from another thread through a [`CancelToken`]; it is never
//! retried. On Unix the renderer runs in its own process group, so helpers it
//! spawns are killed with it.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ReportError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long captured output is awaited once the renderer has exited or been killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Shared flag used to abort a running render.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Program, leading arguments and time limit of the renderer.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["cli.js".to_string()],
            timeout_secs: 120,
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Location of a document produced by the renderer and its size, when it exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
}

impl RenderedDocument {
    /// Looks up the document at `path`.
    ///
    /// A renderer may report success without writing the file; the size is
    /// then `None`.
    pub fn inspect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size_bytes = match fs::metadata(&path) {
            Ok(metadata) => Some(metadata.len()),
            Err(err) => {
                warn!("Rendered document {} is not readable: {err}", path.display());
                None
            }
        };
        Self { path, size_bytes }
    }

    pub fn exists(&self) -> bool {
        self.size_bytes.is_some()
    }

    pub fn size_kib(&self) -> Option<f64> {
        self.size_bytes.map(|bytes| bytes as f64 / 1024.0)
    }
}

/// Runs the external renderer as a blocking child process.
#[derive(Clone, Debug)]
pub struct ExternalRenderInvoker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalRenderInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: RendererConfig::default().timeout(),
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.program.clone())
            .with_args(config.args.clone())
            .with_timeout(config.timeout())
    }

    /// Arguments placed before `--data` and `--output`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Renders `record` to `output` and returns `output` on success.
    pub fn invoke(&self, record: &Value, output: &Path) -> Result<PathBuf> {
        self.invoke_with_cancel(record, output, &CancelToken::new())
    }

    pub fn invoke_with_cancel(
        &self,
        record: &Value,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let payload = serde_json::to_string(record)?;
        debug!(
            "starting renderer `{}` with {} bytes of data",
            self.program,
            payload.len()
        );

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--data")
            .arg(&payload)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| {
            error!("Failed to start renderer `{}`: {source}", self.program);
            ReportError::resource(&self.program, source)
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = self.wait(&mut child, cancel);
        let stdout = collect(stdout);
        let stderr = collect(stderr);
        let status = outcome?;

        if status.success() {
            info!("Document generated successfully: {}", output.display());
            Ok(output.to_path_buf())
        } else {
            error!(
                "Renderer `{}` failed with status {status}: {}",
                self.program,
                stderr.trim()
            );
            Err(ReportError::ExternalProcess {
                program: self.program.clone(),
                code: status.code(),
                stdout,
                stderr,
            })
        }
    }

    fn wait(&self, child: &mut Child, cancel: &CancelToken) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|source| ReportError::resource(&self.program, source))?
            {
                return Ok(status);
            }

            if cancel.is_cancelled() {
                warn!("Renderer `{}` cancelled", self.program);
                terminate(child);
                return Err(ReportError::Cancelled {
                    program: self.program.clone(),
                });
            }

            if Instant::now() >= deadline {
                error!(
                    "Renderer `{}` exceeded timeout of {:?}",
                    self.program, self.timeout
                );
                terminate(child);
                return Err(ReportError::ExternalTimeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kills the renderer and everything in its process group, then reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    kill_process_group(child.id());
    if let Err(err) = child.kill() {
        debug!("kill failed: {err}");
    }
    if let Err(err) = child.wait() {
        debug!("wait after kill failed: {err}");
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let status = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => debug!("kill of process group {pgid} exited with {status}"),
        Err(err) => debug!("failed to signal process group {pgid}: {err}"),
    }
}

/// Reads `reader` to the end on a detached thread.
///
/// The thread outlives the call when a stray process keeps the pipe open.
fn drain<R>(reader: Option<R>) -> Option<Receiver<String>>
where
    R: Read + Send + 'static,
{
    reader.map(|mut reader| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Err(err) = reader.read_to_end(&mut bytes) {
                debug!("failed to read renderer output: {err}");
            }
            if sender.send(String::from_utf8_lossy(&bytes).into_owned()).is_err() {
                debug!("renderer output arrived after the call returned");
            }
        });
        receiver
    })
}

fn collect(receiver: Option<Receiver<String>>) -> String {
    receiver
        .and_then(|receiver| match receiver.recv_timeout(DRAIN_GRACE) {
            Ok(text) => Some(text),
            Err(err) => {
                debug!("renderer output not collected: {err}");
                None
            }
        })
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn stub(script: &str) -> ExternalRenderInvoker {
        ExternalRenderInvoker::new("sh").with_args(["-c", script, "stub"])
    }

    #[test]
    fn zero_exit_returns_the_output_path() {
        let output = Path::new("output/final.pdf");
        let path = stub("exit 0").invoke(&json!({}), output).unwrap();
        assert_eq!(path, output);
    }

    #[test]
    fn receives_data_and_output_flags() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("doc.pdf");
        let script = r#"[ "$1" = "--data" ] && [ "$3" = "--output" ] && printf '%s' "$2" > "$4""#;

        stub(script).invoke(&json!({"a": 1}), &output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), r#"{"a":1}"#);

        let document = RenderedDocument::inspect(&output);
        assert_eq!(document.size_bytes, Some(7));
    }

    #[test]
    fn missing_document_has_no_size() {
        let document = RenderedDocument::inspect("/nonexistent/doc.pdf");
        assert!(!document.exists());
        assert_eq!(document.size_kib(), None);
    }

    #[test]
    fn non_zero_exit_carries_code_and_output() {
        let err = stub("echo out; echo err >&2; exit 3")
            .invoke(&json!({}), Path::new("x.pdf"))
            .unwrap_err();
        match err {
            ReportError::ExternalProcess {
                code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slow_renderer_times_out() {
        let err = stub("sleep 2")
            .with_timeout(Duration::from_millis(100))
            .invoke(&json!({}), Path::new("x.pdf"))
            .unwrap_err();
        assert!(matches!(err, ReportError::ExternalTimeout { .. }));
    }

    #[test]
    fn timeout_is_not_extended_by_helper_processes() {
        let started = Instant::now();
        let err = stub("sleep 6; :")
            .with_timeout(Duration::from_millis(200))
            .invoke(&json!({}), Path::new("x.pdf"))
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ReportError::ExternalTimeout { .. }));
        assert!(elapsed < Duration::from_secs(3), "call took {elapsed:?}");
    }

    #[test]
    fn cancelling_from_another_thread_stops_a_running_render() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = stub("sleep 6; :")
            .invoke_with_cancel(&json!({}), Path::new("x.pdf"), &cancel)
            .unwrap_err();
        let elapsed = started.elapsed();
        canceller.join().unwrap();

        assert!(matches!(err, ReportError::Cancelled { .. }));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(3), "call took {elapsed:?}");
    }

    #[test]
    fn cancelled_render_stops_the_child() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = stub("sleep 2")
            .invoke_with_cancel(&json!({}), Path::new("x.pdf"), &cancel)
            .unwrap_err();
        assert!(matches!(err, ReportError::Cancelled { .. }));
    }

    #[test]
    fn missing_program_is_a_resource_error() {
        let err = ExternalRenderInvoker::new("/nonexistent/renderer")
            .invoke(&json!({}), Path::new("x.pdf"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Resource { .. }));
    }
}
