//! I/O primitives for communicating with the engine subprocess.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use crate::protocol::{grammar, PROMPT_SUFFIX};
use crate::{Error, Result};

const READ_CHUNK: usize = 4096;

/// Any byte source the engine's replies can arrive on.
pub type BoxedReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Any byte sink commands can be written to.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Sync + Unpin>;

/// Reads engine output up to the next prompt.
///
/// The engine signals it is ready for the next command by printing its
/// prompt, so a reply is complete once the accumulated bytes end with `"> "`
/// and no declared payload is still outstanding. Bytes stay undecoded; the
/// grammar decides where the payload is.
///
/// A read that gives up still leaves the engine owing one reply. Owed
/// replies are discarded as they arrive, so a late answer is never taken
/// for the reply to a later command.
pub struct PipeReader {
    reader: BoxedReader,
    owed: usize,
}

impl PipeReader {
    /// Create a new reader from the engine's stdout.
    pub fn new(reader: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            owed: 0,
        }
    }

    /// Replies from earlier reads that gave up and have not arrived yet.
    pub fn owed_replies(&self) -> usize {
        self.owed
    }

    /// Accumulate output until the prompt arrives or `timeout` elapses.
    ///
    /// Returns `Ok(Some(bytes))` with everything read when the prompt is seen,
    /// and `Ok(None)` ("no data") when the deadline passes or the pipe closes
    /// first. Never waits past the deadline.
    pub async fn read_with_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut accumulated = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            self.discard_owed(&mut accumulated);
            if self.owed == 0 && is_complete(&accumulated) {
                return Ok(Some(accumulated));
            }

            match timeout_at(deadline, self.reader.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    tracing::debug!("engine output closed after {} bytes", accumulated.len());
                    return Ok(self.give_up(accumulated));
                }
                Ok(Ok(n)) => accumulated.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(Error::io(e)),
                Err(_) => {
                    tracing::debug!(
                        "no prompt within {:?} ({} bytes pending)",
                        timeout,
                        accumulated.len()
                    );
                    return Ok(self.give_up(accumulated));
                }
            }
        }
    }

    /// Drop complete replies that belong to earlier commands.
    fn discard_owed(&mut self, accumulated: &mut Vec<u8>) {
        while self.owed > 0 {
            let Some(len) = grammar::reply_len(accumulated) else {
                return;
            };
            tracing::debug!("discarding late reply ({} bytes)", len);
            accumulated.drain(..len);
            self.owed -= 1;
        }
    }

    /// A prompt with a short payload is handed on so the grammar reports the
    /// length error. Anything else is "no data", and the reply is still owed.
    fn give_up(&mut self, accumulated: Vec<u8>) -> Option<Vec<u8>> {
        if self.owed == 0 && ends_with_prompt(&accumulated) {
            return Some(accumulated);
        }
        self.owed += 1;
        None
    }
}

fn ends_with_prompt(bytes: &[u8]) -> bool {
    bytes.ends_with(PROMPT_SUFFIX)
}

fn is_complete(bytes: &[u8]) -> bool {
    ends_with_prompt(bytes) && !grammar::awaiting_payload(bytes)
}

/// Writes commands to the engine's stdin.
pub struct CommandWriter {
    writer: BoxedWriter,
}

impl CommandWriter {
    /// Create a new writer from the engine's stdin.
    pub fn new(writer: impl AsyncWrite + Send + Sync + Unpin + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write a plain command, terminated by a carriage return.
    pub async fn write_command(&mut self, command: &str) -> Result<()> {
        self.write_raw(&command_line(command)).await
    }

    /// Write a command with an optional trailing float argument.
    pub async fn write_float_command(&mut self, command: &str, arg: Option<f64>) -> Result<()> {
        self.write_raw(&float_command_line(command, arg)).await
    }

    /// Close the engine's stdin.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(Error::io)
    }

    async fn write_raw(&mut self, line: &str) -> Result<()> {
        tracing::trace!("-> {:?}", line);
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(Error::io)?;
        self.writer.flush().await.map_err(Error::io)
    }
}

/// The engine expects `\r` after plain commands.
fn command_line(command: &str) -> String {
    format!("{}\r", command)
}

fn float_command_line(command: &str, arg: Option<f64>) -> String {
    match arg {
        Some(value) => format!("{} {}\n", command, value),
        None => format!("{}\n", command),
    }
}
