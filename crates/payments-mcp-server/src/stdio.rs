//! Single-session transport over stdin/stdout.
//!
//! Each input line is one JSON-RPC body (a message or a batch). Replies and
//! anything the handler pushes onto its stream are written back one JSON
//! value per line. End of input closes the handler.

use futures::StreamExt;
use payments_mcp::jsonrpc::{error_envelope, PARSE_ERROR};
use payments_mcp::SessionHandler;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}

/// Serve one session until `input` ends. Pushed messages already queued are
/// written before the next line is read.
pub async fn serve<H, R, W>(handler: &H, input: R, mut output: W) -> std::io::Result<()>
where
    H: SessionHandler,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut pushed = handler.stream().ok();

    loop {
        tokio::select! {
            biased;

            Some(message) = async {
                match pushed.as_mut() {
                    Some(stream) => stream.next().await,
                    None => None,
                }
            } => {
                write_line(&mut output, &message).await?;
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let reply = match serde_json::from_str::<Value>(line) {
                    Ok(body) => handler.handle(body).await,
                    Err(e) => {
                        tracing::debug!(error = %e, "unparseable stdio line");
                        Some(error_envelope(PARSE_ERROR, "Parse error"))
                    }
                };
                if let Some(reply) = reply {
                    write_line(&mut output, &reply).await?;
                }
            }
        }
    }

    if let Err(e) = handler.close().await {
        tracing::warn!(error = %e, "stdio session teardown failed");
    }
    Ok(())
}
