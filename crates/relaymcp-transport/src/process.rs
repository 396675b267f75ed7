//! Child process transport.
//!
//! Spawns a server subprocess connected by three pipes and frames JSON
//! messages over its stdin/stdout. Framing is newline-delimited JSON or
//! LSP-style `Content-Length` headers; stderr handling is configurable.
//!
//! Locking follows the hybrid pattern used across this workspace:
//! `std::sync::Mutex` for state snapshots (never held across `.await`),
//! `tokio::sync::Mutex` for the writer and child handles that must cross
//! await points. `stop` takes the child out of its mutex before any
//! graceful-shutdown waits, so concurrent `receive` callers are never
//! blocked behind the grace period.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as TokioMutex, mpsc};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::error::{TransportError, TransportResult};
use crate::traits::Transport;

/// How messages are framed on the child's stdio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// One JSON document per line
    #[default]
    NewlineDelimited,
    /// `Content-Length: N\r\n\r\n` followed by N bytes of UTF-8 JSON
    ContentLength,
}

/// What to do with the child's stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrMode {
    /// Silently drop stderr output
    Discard,
    /// Inherit the parent's stderr
    Passthrough,
    /// Collect stderr lines into a buffer readable via
    /// [`ProcessTransport::stderr_output`]
    #[default]
    Capture,
}

/// Configuration for the child process transport
#[derive(Debug, Clone)]
pub struct ProcessTransportConfig {
    /// Command to execute
    pub command: String,
    /// Arguments to pass to the command
    pub args: Vec<String>,
    /// Working directory for the process
    pub working_directory: Option<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Message framing on stdin/stdout
    pub framing: Framing,
    /// Stderr handling
    pub stderr: StderrMode,
    /// Maximum message size in bytes; exceeding it is fatal
    pub max_message_size: usize,
    /// Time to wait for the child to exit after stdin closes
    pub shutdown_timeout: Duration,
    /// Grace period between the termination and kill signals
    pub kill_grace: Duration,
    /// Skip pre-spawn command validation
    pub skip_command_validation: bool,
}

impl Default for ProcessTransportConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            working_directory: None,
            env: Vec::new(),
            framing: Framing::default(),
            stderr: StderrMode::default(),
            max_message_size: 10 * 1024 * 1024,
            shutdown_timeout: Duration::from_secs(5),
            kill_grace: Duration::from_secs(2),
            skip_command_validation: false,
        }
    }
}

impl ProcessTransportConfig {
    /// Config for `command` with default settings.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Append arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the framing mode.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the stderr mode.
    pub fn with_stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }
}

/// Validate the command and arguments before spawning.
///
/// Null bytes and control characters in the program name or any argument
/// are rejected; they cannot be part of a legitimate command and are the
/// classic vehicle for log injection and argv confusion.
fn validate_command(config: &ProcessTransportConfig) -> TransportResult<()> {
    if config.command.is_empty() {
        return Err(TransportError::Configuration(
            "command cannot be empty".to_string(),
        ));
    }
    let offending = std::iter::once(config.command.as_str())
        .chain(config.args.iter().map(String::as_str))
        .find(|s| s.bytes().any(|b| b == 0 || (b.is_ascii_control() && b != b'\t')));
    if offending.is_some() {
        return Err(TransportError::Configuration(
            "command or argument contains control characters".to_string(),
        ));
    }
    Ok(())
}

type StdinWriter = BufWriter<ChildStdin>;

/// Child process transport implementation
#[derive(Debug)]
pub struct ProcessTransport {
    config: ProcessTransportConfig,

    /// Running flag (lock-free reads on the send/receive hot path)
    running: Arc<AtomicBool>,

    /// Child handle (tokio mutex - crosses await boundaries)
    child: Arc<TokioMutex<Option<Child>>>,

    /// Stdin writer; the lock also serializes senders so frames never
    /// interleave
    stdin_writer: Arc<TokioMutex<Option<StdinWriter>>>,

    /// Inbound message channel drained by `receive`
    receive_channel: Arc<TokioMutex<Option<mpsc::Receiver<Value>>>>,

    /// Reader task handle
    reader_task: Arc<TokioMutex<Option<tokio::task::JoinHandle<()>>>>,

    /// Captured stderr lines (StderrMode::Capture)
    stderr_buffer: Arc<StdMutex<Vec<String>>>,

    /// Exit status once the child reaps
    exit_code: Arc<StdMutex<Option<i32>>>,
}

impl ProcessTransport {
    /// Create a transport for the given configuration. The child is not
    /// spawned until [`start`](Transport::start).
    pub fn new(config: ProcessTransportConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            child: Arc::new(TokioMutex::new(None)),
            stdin_writer: Arc::new(TokioMutex::new(None)),
            receive_channel: Arc::new(TokioMutex::new(None)),
            reader_task: Arc::new(TokioMutex::new(None)),
            stderr_buffer: Arc::new(StdMutex::new(Vec::new())),
            exit_code: Arc::new(StdMutex::new(None)),
        }
    }

    /// Captured stderr output, one entry per line. Empty unless the
    /// transport was configured with [`StderrMode::Capture`].
    pub fn stderr_output(&self) -> Vec<String> {
        self.stderr_buffer
            .lock()
            .expect("stderr mutex poisoned")
            .clone()
    }

    /// Exit code of the child, once it has been reaped.
    pub fn child_exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().expect("exit code mutex poisoned")
    }

    fn frame_message(&self, message: &Value) -> TransportResult<Vec<u8>> {
        let json = serde_json::to_string(message)
            .map_err(|e| TransportError::Protocol(format!("failed to serialize message: {e}")))?;

        if json.len() > self.config.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: json.len(),
                max: self.config.max_message_size,
            });
        }

        match self.config.framing {
            Framing::NewlineDelimited => {
                // Newline framing cannot carry literal newlines; serde_json
                // escapes them inside strings, so seeing one here means the
                // payload would corrupt the stream.
                if json.contains('\n') || json.contains('\r') {
                    return Err(TransportError::Protocol(
                        "message contains embedded newlines".to_string(),
                    ));
                }
                let mut frame = json.into_bytes();
                frame.push(b'\n');
                Ok(frame)
            }
            Framing::ContentLength => {
                let mut frame =
                    format!("Content-Length: {}\r\n\r\n", json.len()).into_bytes();
                frame.extend_from_slice(json.as_bytes());
                Ok(frame)
            }
        }
    }

    fn spawn_reader_task(
        &self,
        stdout: ChildStdout,
        tx: mpsc::Sender<Value>,
    ) -> tokio::task::JoinHandle<()> {
        let framing = self.config.framing;
        let max_size = self.config.max_message_size;
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            loop {
                let frame = match framing {
                    Framing::NewlineDelimited => read_line_frame(&mut reader, max_size).await,
                    Framing::ContentLength => {
                        read_content_length_frame(&mut reader, max_size).await
                    }
                };

                match frame {
                    Ok(Some(payload)) => {
                        match serde_json::from_slice::<Value>(&payload) {
                            Ok(value) => {
                                trace!("received {} bytes from child", payload.len());
                                if tx.send(value).await.is_err() {
                                    debug!("receive channel dropped, stopping reader task");
                                    break;
                                }
                            }
                            Err(e) => {
                                // Malformed JSON is logged and dropped; the
                                // stream itself is still framed correctly.
                                warn!("dropping unparseable message from child: {e}");
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("child stdout reached EOF");
                        break;
                    }
                    Err(TransportError::MessageTooLarge { size, max }) => {
                        error!("message of {size} bytes exceeds limit of {max} bytes, stopping transport");
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => {
                        error!("failed to read from child stdout: {e}");
                        break;
                    }
                }
            }
            debug!("process reader task completed");
        })
    }

    fn spawn_stderr_task(&self, stderr: tokio::process::ChildStderr) {
        let buffer = Arc::clone(&self.stderr_buffer);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("child stderr: {line}");
                buffer.lock().expect("stderr mutex poisoned").push(line);
            }
        });
    }
}

/// Read one newline-delimited frame. `Ok(None)` on EOF.
async fn read_line_frame(
    reader: &mut BufReader<ChildStdout>,
    max_size: usize,
) -> TransportResult<Option<Vec<u8>>> {
    let mut line = Vec::new();
    loop {
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Ok(if line.is_empty() { None } else { Some(line) });
        }
        if line.len() > max_size {
            return Err(TransportError::MessageTooLarge {
                size: line.len(),
                max: max_size,
            });
        }
        while line.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
            line.pop();
        }
        if line.is_empty() {
            // blank line between messages
            continue;
        }
        return Ok(Some(line));
    }
}

/// Read one `Content-Length`-framed message. `Ok(None)` on EOF before a
/// header starts.
async fn read_content_length_frame(
    reader: &mut BufReader<ChildStdout>,
    max_size: usize,
) -> TransportResult<Option<Vec<u8>>> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 {
            return if content_length.is_none() {
                Ok(None)
            } else {
                Err(TransportError::Protocol(
                    "EOF inside message headers".to_string(),
                ))
            };
        }
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break; // end of headers
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            let length: usize = value.trim().parse().map_err(|_| {
                TransportError::Protocol(format!("invalid Content-Length: {value:?}"))
            })?;
            content_length = Some(length);
        }
        // Unknown headers are tolerated and skipped.
    }

    let length = content_length.ok_or_else(|| {
        TransportError::Protocol("missing Content-Length header".to_string())
    })?;
    if length > max_size {
        return Err(TransportError::MessageTooLarge {
            size: length,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn start(&self) -> TransportResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        if !self.config.skip_command_validation {
            validate_command(&self.config)?;
        }

        info!(
            "starting child process: {} {:?}",
            self.config.command, self.config.args
        );

        // Build the full command up front; nothing is allocated between
        // fork and exec (tokio materializes the argv before spawning).
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true);

        match self.config.stderr {
            StderrMode::Discard => {
                cmd.stderr(Stdio::null());
            }
            StderrMode::Passthrough => {
                cmd.stderr(Stdio::inherit());
            }
            StderrMode::Capture => {
                cmd.stderr(Stdio::piped());
            }
        }

        if let Some(ref wd) = self.config.working_directory {
            cmd.current_dir(wd);
        }
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            TransportError::ConnectionFailed(format!("failed to spawn process: {e}"))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::ConnectionFailed("failed to get stdin handle".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::ConnectionFailed("failed to get stdout handle".to_string())
        })?;
        if self.config.stderr == StderrMode::Capture {
            let stderr = child.stderr.take().ok_or_else(|| {
                TransportError::ConnectionFailed("failed to get stderr handle".to_string())
            })?;
            self.spawn_stderr_task(stderr);
        }

        let (tx, rx) = mpsc::channel(256);
        *self.receive_channel.lock().await = Some(rx);
        *self.stdin_writer.lock().await = Some(BufWriter::new(stdin));
        *self.reader_task.lock().await = Some(self.spawn_reader_task(stdout, tx));
        *self.child.lock().await = Some(child);
        self.exit_code.lock().expect("exit code mutex poisoned").take();

        self.running.store(true, Ordering::SeqCst);
        debug!("process transport started");
        Ok(())
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            // Already stopped; still make sure any leftover child is gone.
            if self.child.lock().await.is_none() {
                return;
            }
        }

        // Close stdin first: a well-behaved server exits on EOF.
        *self.stdin_writer.lock().await = None;
        *self.receive_channel.lock().await = None;
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }

        // Take the child out of its mutex before waiting, so no lock is
        // held across the grace periods.
        let child = self.child.lock().await.take();
        let Some(mut child) = child else {
            return;
        };

        let status = match timeout(self.config.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!("child exited with {status}");
                Some(status)
            }
            Ok(Err(e)) => {
                error!("failed to wait for child exit: {e}");
                None
            }
            Err(_) => {
                warn!("child did not exit after stdin close, sending termination signal");
                if let Err(e) = child.start_kill() {
                    warn!("failed to signal child: {e}");
                }
                match timeout(self.config.kill_grace, child.wait()).await {
                    Ok(Ok(status)) => Some(status),
                    _ => {
                        warn!("child survived termination signal, killing");
                        if let Err(e) = child.kill().await {
                            error!("failed to kill child: {e}");
                        }
                        child.wait().await.ok()
                    }
                }
            }
        };

        if let Some(status) = status {
            *self.exit_code.lock().expect("exit code mutex poisoned") = status.code();
        }
        debug!("process transport stopped");
    }

    async fn send(&self, message: Value) -> TransportResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let frame = self.frame_message(&message)?;

        let mut writer_guard = self.stdin_writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(TransportError::Closed)?;

        // write_all retries short writes until the frame is fully queued;
        // holding the writer lock until flush keeps frames contiguous.
        if let Err(e) = writer.write_all(&frame).await {
            error!("failed to write to child stdin: {e}");
            self.running.store(false, Ordering::SeqCst);
            return Err(TransportError::SendFailed(e.to_string()));
        }
        if let Err(e) = writer.flush().await {
            error!("failed to flush child stdin: {e}");
            self.running.store(false, Ordering::SeqCst);
            return Err(TransportError::SendFailed(e.to_string()));
        }

        trace!("sent {} bytes to child", frame.len());
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Value> {
        let mut channel_guard = self.receive_channel.lock().await;
        let receiver = channel_guard.as_mut().ok_or(TransportError::Closed)?;
        match receiver.recv().await {
            Some(value) => Ok(value),
            None => {
                self.running.store(false, Ordering::SeqCst);
                Err(TransportError::Closed)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
