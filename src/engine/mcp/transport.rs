// ── Octoscout Engine: MCP stdio transport ──────────────────────────────────
// Spawns the tool-provider child process and exchanges JSON-RPC messages over
// its stdin/stdout. MCP stdio framing is newline-delimited: one JSON object
// per line, no embedded newlines.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use super::types::{JsonRpcRequest, JsonRpcResponse};

/// A running stdio transport — owns the child process and message routing.
pub struct StdioTransport {
    /// Sender to write JSON-RPC messages to the child's stdin.
    writer_tx: mpsc::Sender<Vec<u8>>,
    /// Pending requests awaiting responses, keyed by JSON-RPC id.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>,
    /// Handle to the child process (for teardown).
    child: Arc<Mutex<Option<Child>>>,
    _reader_handle: tokio::task::JoinHandle<()>,
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl StdioTransport {
    /// Spawn the child process and set up bidirectional JSON-RPC routing.
    /// Spawn failure here is a launch error, not a protocol error — callers
    /// surface it before any handshake is attempted.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, String> {
        info!("[mcp] Spawning: {} {}", command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        // Credentials travel to the child via its environment
        for (k, v) in env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to spawn tool server `{}`: {}", command, e))?;

        let stdin = child.stdin.take().ok_or("Failed to open child stdin")?;
        let stdout = child.stdout.take().ok_or("Failed to open child stdout")?;
        let stderr = child.stderr.take().ok_or("Failed to open child stderr")?;

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        // ── Writer task: one JSON object per line to stdin ──────────────
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        let _writer_handle = {
            let mut stdin = stdin;
            tokio::spawn(async move {
                while let Some(mut msg) = writer_rx.recv().await {
                    msg.push(b'\n');
                    if let Err(e) = stdin.write_all(&msg).await {
                        error!("[mcp] stdin write error: {}", e);
                        break;
                    }
                    if let Err(e) = stdin.flush().await {
                        error!("[mcp] stdin flush error: {}", e);
                        break;
                    }
                }
                debug!("[mcp] Writer task exiting");
            })
        };

        // ── Reader task: routes responses to their pending senders ──────
        let _reader_handle = {
            let pending = Arc::clone(&pending);
            let mut reader = BufReader::new(stdout);
            tokio::spawn(async move {
                loop {
                    match read_message(&mut reader).await {
                        Ok(Some(data)) => match serde_json::from_slice::<JsonRpcResponse>(&data) {
                            Ok(resp) => {
                                if let Some(id) = resp.id {
                                    let mut map = pending.lock().await;
                                    if let Some(tx) = map.remove(&id) {
                                        let _ = tx.send(resp);
                                    } else {
                                        debug!("[mcp] Response for unknown id={}, ignoring", id);
                                    }
                                } else {
                                    // Notification (no id) — log and discard
                                    debug!(
                                        "[mcp] Received notification ({} bytes)",
                                        data.len()
                                    );
                                }
                            }
                            Err(e) => {
                                warn!("[mcp] Failed to parse response: {}", e);
                            }
                        },
                        Ok(None) => {
                            info!("[mcp] Stdout closed (server exited)");
                            break;
                        }
                        Err(e) => {
                            error!("[mcp] Read error: {}", e);
                            break;
                        }
                    }
                }
            })
        };

        // ── Stderr drain ────────────────────────────────────────────────
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            debug!("[mcp:stderr] {}", trimmed);
                        }
                    }
                    Err(e) => {
                        warn!("[mcp] stderr read error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(StdioTransport {
            writer_tx,
            pending,
            child: Arc::new(Mutex::new(Some(child))),
            _reader_handle,
            _writer_handle,
        })
    }

    /// Send a JSON-RPC request and wait for its response.
    pub async fn send_request(
        &self,
        request: JsonRpcRequest,
        timeout_secs: u64,
    ) -> Result<JsonRpcResponse, String> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();

        {
            let mut map = self.pending.lock().await;
            map.insert(id, tx);
        }

        let body = serde_json::to_vec(&request).map_err(|e| format!("Serialize error: {}", e))?;
        if self.writer_tx.send(body).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err("Transport writer closed".to_string());
        }

        let resp = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), rx).await;
        match resp {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err("Response channel dropped (server exited)".to_string()),
            Err(_) => {
                // Drop the stale entry so a late response is discarded
                self.pending.lock().await.remove(&id);
                Err(format!("Request timed out after {}s (id={})", timeout_secs, id))
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), String> {
        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(serde_json::json!({})),
        });
        let body = serde_json::to_vec(&notif).map_err(|e| format!("Serialize error: {}", e))?;
        self.writer_tx
            .send(body)
            .await
            .map_err(|_| "Transport writer closed".to_string())
    }

    /// Kill the child process. Idempotent — the second call finds no child
    /// and does nothing.
    pub async fn shutdown(&self) {
        let mut guard = self.child.lock().await;
        if let Some(ref mut child) = *guard {
            info!("[mcp] Terminating tool server process");
            let _ = child.kill().await;
        }
        *guard = None;
    }

    /// Check if the child process is still running.
    pub async fn is_alive(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

// ── Newline-delimited message reader ────────────────────────────────────────

/// Read a single newline-delimited JSON message from the stream.
/// Blank lines are skipped. Returns `Ok(None)` on EOF.
async fn read_message<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<Option<Vec<u8>>, String> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| format!("Line read error: {}", e))?;
        if n == 0 {
            return Ok(None); // EOF
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.as_bytes().to_vec()));
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
