//! The two per-session tasks.

pub(crate) mod inbound;
pub(crate) mod outbound;

use std::time::Duration;

use futures::SinkExt;

use crate::transport::{Frame, FrameSink};

/// Write one frame under an absolute deadline of `now + deadline`.
pub(crate) async fn write(sink: &mut FrameSink, frame: Frame, deadline: Duration) -> Result<(), String> {
    match tokio::time::timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("write deadline of {deadline:?} exceeded")),
    }
}
