//! Pipe a session to newline-delimited JSON streams.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use comms_socket::{CloseReason, Session};

/// Start `session`, send every JSON line read from `input`, and write every
/// inbound payload to `output` as one line.
///
/// End of input half-closes the session's outbound side; the bridge returns
/// once the session is torn down.
pub async fn run<R, W>(session: &Session<Value, Value>, input: R, mut output: W) -> Result<CloseReason>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut inbound = session.take_inbound()?;
    let mut outbound = Some(session.outbound()?);
    session.start()?;

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line(), if outbound.is_some() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match serde_json::from_str::<Value>(&line) {
                    Ok(value) => {
                        let sent = match &outbound {
                            Some(tx) => tx.send(value).await.is_ok(),
                            None => false,
                        };
                        if !sent {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping input line that is not JSON"),
                },
                None => {
                    outbound = None;
                    session.close_outbound();
                }
            },
            payload = inbound.recv() => match payload {
                Some(value) => {
                    let mut line = serde_json::to_vec(&value)?;
                    line.push(b'\n');
                    output.write_all(&line).await?;
                    output.flush().await?;
                }
                None => break,
            },
        }
    }

    Ok(session.closed().await)
}
