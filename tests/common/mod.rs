//! Test utilities for ecacontrol integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use ecacontrol::{EngineProcess, Session, SessionConfig};

pub const PROMPT: &str = "ecasound ('h' for help)> ";

/// Commands the mock reports for `int-cmd-list`.
pub const COMMANDS: &[&str] = &[
    "c-add",
    "c-list",
    "c-select",
    "cop-select",
    "cs-add",
    "cs-connect",
    "cs-get-length",
    "int-cmd-list",
    "start",
    "stop",
];

/// Frame a reply the way the engine does in well-formed output mode.
pub fn frame(tag: &str, payload: &str) -> String {
    frame_with_length(payload.len(), tag, payload)
}

pub fn frame_with_length(declared: usize, tag: &str, payload: &str) -> String {
    format!("256 {} {}\r\n{}\r\n\r\n{}", declared, tag, payload, PROMPT)
}

/// A scripted engine on in-memory pipes.
///
/// Without a script entry it keeps a list of chains for `c-add` and
/// `c-list`, reports [`COMMANDS`] for `int-cmd-list`, answers other known
/// commands with an empty reply, and rejects everything else.
pub struct MockEngine {
    version: String,
    script: HashMap<String, String>,
    silent: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            version: "2.9.3".to_string(),
            script: HashMap::new(),
            silent: HashSet::new(),
            delays: HashMap::new(),
        }
    }

    /// Version printed in the banner.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Answer `command` with a well-formed reply.
    pub fn reply(self, command: &str, tag: &str, payload: &str) -> Self {
        self.raw(command, frame(tag, payload))
    }

    /// Answer `command` with exactly these bytes.
    pub fn raw(mut self, command: &str, blob: impl Into<String>) -> Self {
        self.script.insert(command.to_string(), blob.into());
        self
    }

    /// Never answer `command`.
    pub fn silent(mut self, command: &str) -> Self {
        self.silent.insert(command.to_string());
        self
    }

    /// Wait `delay` before answering `command`.
    pub fn delay(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    /// Run the engine and return the client side of its pipes.
    pub fn start(self) -> (EngineProcess, MockHandle) {
        let (client_in, engine_out) = tokio::io::duplex(64 * 1024);
        let (engine_in, client_out) = tokio::io::duplex(64 * 1024);
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn(self.run(engine_in, engine_out, Arc::clone(&received)));
        let process = EngineProcess::from_pipes(client_in, client_out);
        (process, MockHandle { received, task })
    }

    /// Start the engine and connect a session with a short read timeout.
    pub async fn connect(self) -> (Session, MockHandle) {
        let (process, handle) = self.start();
        let session = Session::connect(process, test_config())
            .await
            .expect("mock engine should connect");
        (session, handle)
    }

    async fn run(
        self,
        mut input: DuplexStream,
        mut output: DuplexStream,
        received: Arc<Mutex<Vec<String>>>,
    ) {
        let banner = format!(
            "********************************************************************************\n\
             *        ecasound v{} (C) 1997-2021 Kai Vehmanen and others\n\
             ********************************************************************************\n{}",
            self.version, PROMPT
        );
        if output.write_all(banner.as_bytes()).await.is_err() {
            return;
        }

        let mut chains: Vec<String> = Vec::new();
        let mut pending = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = match input.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            pending.extend_from_slice(&buf[..n]);

            while let Some(end) = pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=end).collect();
                let line = String::from_utf8_lossy(&line[..end]).into_owned();
                received.lock().unwrap().push(line.clone());

                if line == "quit" {
                    return;
                }
                let Some(blob) = self.respond(&line, &mut chains) else {
                    continue;
                };
                if let Some(delay) = self.delays.get(&line) {
                    tokio::time::sleep(*delay).await;
                }
                if output.write_all(blob.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }

    fn respond(&self, line: &str, chains: &mut Vec<String>) -> Option<String> {
        if self.silent.contains(line) {
            return None;
        }
        if let Some(blob) = self.script.get(line) {
            return Some(blob.clone());
        }

        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, Some(arg)),
            None => (line, None),
        };
        let blob = match (command, arg) {
            ("c-add", Some(name)) => {
                chains.push(name.to_string());
                frame("-", "")
            }
            ("c-list", None) => frame("S", &chains.join(",")),
            ("int-cmd-list", None) => frame("S", &COMMANDS.join(",")),
            (known, _) if COMMANDS.contains(&known) => frame("-", ""),
            _ => frame("e", &format!("Unknown command: {}", line)),
        };
        Some(blob)
    }
}

/// Access to what a running [`MockEngine`] saw.
pub struct MockHandle {
    received: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockHandle {
    /// Every command line received so far, without terminators.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// Wait for the engine to see `quit` or a closed pipe.
    pub async fn finished(self) -> Vec<String> {
        let MockHandle { received, task } = self;
        task.await.unwrap();
        let lines = received.lock().unwrap().clone();
        lines
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::builder()
        .read_timeout(Duration::from_millis(200))
        .startup_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}
