//! Fake nREPL server for behavioural tests.
//!
//! Accepts a single connection, decodes each request the client sends, and
//! answers it with the next batch of canned replies from a script.

use std::io::{self, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use rep_protocol::{Decoder, Value};

/// Replies sent in answer to one request.
pub(in crate::tests) type ReplyBatch = Vec<Value>;

/// A scripted server listening on an ephemeral loopback port.
pub(in crate::tests) struct FakeServer {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    /// Spawns a server that answers the n-th request with the n-th batch and
    /// hangs up once the script is exhausted.
    pub fn spawn(script: Vec<ReplyBatch>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let requests_clone = Arc::clone(&requests);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve_client(&listener, &script, &requests_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            requests,
            result,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the server thread to finish and returns the decoded requests.
    pub fn take_requests(&mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake server result: {error}"))?
            .take()
        {
            outcome.context("fake server failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve_client(
        listener: &TcpListener,
        script: &[ReplyBatch],
        requests: &Arc<Mutex<Vec<Value>>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Self::converse(stream, script, requests),
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // The client gave up before connecting; nothing to record.
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn converse(
        stream: TcpStream,
        script: &[ReplyBatch],
        requests: &Arc<Mutex<Vec<Value>>>,
    ) -> Result<()> {
        stream
            .set_nonblocking(false)
            .context("blocking client stream")?;
        let mut writer = stream.try_clone().context("clone stream")?;
        let mut decoder = Decoder::new(BufReader::new(stream));
        for batch in script {
            let Some(request) = decoder.read_message().context("decode request")? else {
                return Ok(());
            };
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(request);
            for reply in batch {
                writer
                    .write_all(&reply.encode())
                    .context("write reply")?;
            }
            writer.flush().context("flush replies")?;
        }
        Ok(())
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
