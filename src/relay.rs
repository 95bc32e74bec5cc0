//! Event relay
//!
//! Drives the relay state machine over a live generation stream: decodes
//! each oracle chunk, feeds the result through [`Relay`], and forwards wire
//! events to the consumer in arrival order.

pub mod state;

#[cfg(test)]
mod proptests;

pub use state::{Relay, RelayInput, RelayOutput, RelayState, STREAM_ERROR_MESSAGE};

use crate::llm::{ChunkDecoder, LlmError, RawChunkStream, Record};
use crate::wire::StreamEvent;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

/// What happens to the upstream generation when the consumer goes away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Keep reading the upstream to completion and discard the output
    #[default]
    Drain,
    /// Drop the upstream connection as soon as the consumer is gone
    Abort,
}

/// Start relaying a generation stream.
///
/// Reads until the first output decides the response framing. An upstream
/// failure before that point is returned as `Err` so the caller can answer
/// with a plain error. Otherwise the returned stream yields every wire event,
/// ending with exactly one [`StreamEvent::Done`].
pub async fn start(
    mut chunks: RawChunkStream,
    decoder: ChunkDecoder,
    policy: DisconnectPolicy,
) -> Result<ReceiverStream<StreamEvent>, LlmError> {
    let mut relay = Relay::new();
    let mut opening = Vec::new();

    while relay.state() == RelayState::Open {
        let Some(input) = next_input(&mut chunks, decoder).await else {
            continue;
        };
        for output in relay.feed(input) {
            match output {
                RelayOutput::SendHeaders => {}
                RelayOutput::Event(event) => opening.push(event),
                RelayOutput::Reject(err) => return Err(err),
            }
        }
    }

    // One event in flight at a time
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(
        forward(relay, chunks, decoder, opening, tx, policy).instrument(tracing::Span::current()),
    );
    Ok(ReceiverStream::new(rx))
}

/// Pull the next chunk and translate it into a relay input. `None` means the
/// chunk carried nothing for the relay.
async fn next_input(chunks: &mut RawChunkStream, decoder: ChunkDecoder) -> Option<RelayInput> {
    match chunks.next().await {
        None => Some(RelayInput::UpstreamEnd),
        Some(Err(e)) => {
            tracing::warn!(error = %e, kind = ?e.kind, "Generation stream failed");
            Some(RelayInput::UpstreamError(e))
        }
        Some(Ok(chunk)) => match decoder.decode_record(&chunk) {
            Record::Delta(delta) => Some(RelayInput::Delta(delta)),
            Record::OracleError(message) => {
                tracing::warn!(error = %message, "Generation oracle reported an error");
                Some(RelayInput::UpstreamError(LlmError::server_error(message)))
            }
            Record::Stop => Some(RelayInput::UpstreamEnd),
            Record::Ignored => None,
        },
    }
}

async fn forward(
    mut relay: Relay,
    mut chunks: RawChunkStream,
    decoder: ChunkDecoder,
    opening: Vec<StreamEvent>,
    tx: mpsc::Sender<StreamEvent>,
    policy: DisconnectPolicy,
) {
    let mut connected = true;
    let mut sent = 0usize;
    let mut discarded = 0usize;

    for event in opening {
        if deliver(&tx, event, &mut connected).await {
            sent += 1;
        }
    }

    while !relay.state().is_closed() {
        if !connected && policy == DisconnectPolicy::Abort {
            tracing::info!(sent, "Aborting upstream generation after disconnect");
            return;
        }
        let input = match policy {
            // A stalled upstream must not outlive the consumer
            DisconnectPolicy::Abort => tokio::select! {
                input = next_input(&mut chunks, decoder) => input,
                () = tx.closed() => {
                    tracing::info!("Consumer disconnected");
                    connected = false;
                    None
                }
            },
            DisconnectPolicy::Drain => next_input(&mut chunks, decoder).await,
        };
        let Some(input) = input else {
            continue;
        };
        for output in relay.feed(input) {
            if let RelayOutput::Event(event) = output {
                if deliver(&tx, event, &mut connected).await {
                    sent += 1;
                } else {
                    discarded += 1;
                }
            }
        }
    }

    tracing::debug!(state = ?relay.state(), sent, discarded, "Relay closed");
}

/// Send one event unless the consumer is already gone. Returns whether it
/// was delivered.
async fn deliver(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent, connected: &mut bool) -> bool {
    if *connected && tx.send(event).await.is_err() {
        *connected = false;
        tracing::info!("Consumer disconnected");
    }
    *connected
}
