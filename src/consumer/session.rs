//! Chat session driver
//!
//! Executes consumer effects: owns the single live connection, reads the
//! relay's event stream on a background task and feeds signals back through
//! the transition function.

use super::effect::Effect;
use super::event::{ConsumerEvent, StreamSignal};
use super::state::{Conversation, Turn, TurnId};
use super::transition::{transition, TransitionError};
use crate::api::ErrorResponse;
use crate::framing;
use crate::wire::StreamEvent;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SIGNAL_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("turn {0} is no longer part of the conversation")]
    MissingTurn(TurnId),
}

/// Draws a turn whenever its content changes
pub trait Render {
    fn render(&mut self, turn: &Turn);
}

pub struct ChatSession {
    client: Client,
    endpoint: String,
    conversation: Conversation,
    connection: Option<CancellationToken>,
    signals_tx: mpsc::Sender<(TurnId, StreamSignal)>,
    signals_rx: mpsc::Receiver<(TurnId, StreamSignal)>,
}

impl ChatSession {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ConsumerError> {
        let client = Client::builder().build()?;
        let (signals_tx, signals_rx) = mpsc::channel(SIGNAL_BUFFER);
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            conversation: Conversation::new(),
            connection: None,
            signals_tx,
            signals_rx,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Start a new exchange. Rejected while another one is in flight.
    pub fn submit(&mut self, question: &str, render: &mut dyn Render) -> Result<TurnId, ConsumerError> {
        let turn = TurnId::new();
        self.apply(
            ConsumerEvent::Submit {
                turn,
                question: question.to_string(),
            },
            render,
        )?;
        Ok(turn)
    }

    /// Wait for the next signal from the live connection and apply it
    pub async fn pump(&mut self, render: &mut dyn Render) -> Result<(), ConsumerError> {
        // The session keeps a sender, so the channel never closes under us
        if let Some((turn, signal)) = self.signals_rx.recv().await {
            self.apply(ConsumerEvent::Stream { turn, signal }, render)?;
        }
        Ok(())
    }

    /// Submit a question and pump until its turn completes
    pub async fn ask(&mut self, question: &str, render: &mut dyn Render) -> Result<Turn, ConsumerError> {
        let turn = self.submit(question, render)?;
        loop {
            let current = self
                .conversation
                .turn(turn)
                .ok_or(ConsumerError::MissingTurn(turn))?;
            if current.is_complete() {
                return Ok(current.clone());
            }
            self.pump(render).await?;
        }
    }

    fn apply(&mut self, event: ConsumerEvent, render: &mut dyn Render) -> Result<(), ConsumerError> {
        let effects = transition(&mut self.conversation, event, chrono::Utc::now())?;
        for effect in effects {
            self.execute(effect, render);
        }
        Ok(())
    }

    fn execute(&mut self, effect: Effect, render: &mut dyn Render) {
        match effect {
            Effect::CloseStaleConnection => {
                if let Some(stale) = self.connection.take() {
                    tracing::debug!("Closing stale connection");
                    stale.cancel();
                }
            }
            Effect::OpenConnection { turn, question } => {
                let cancel = CancellationToken::new();
                let connection = Connection {
                    client: self.client.clone(),
                    endpoint: self.endpoint.clone(),
                    turn,
                    signals: self.signals_tx.clone(),
                };
                tokio::spawn(connection.run(question, cancel.clone()));
                self.connection = Some(cancel);
            }
            Effect::Render { turn } => {
                if let Some(current) = self.conversation.turn(turn) {
                    render.render(current);
                }
            }
            Effect::ReleaseConnection { turn } => {
                if let Some(connection) = self.connection.take() {
                    tracing::debug!(%turn, "Releasing connection");
                    connection.cancel();
                }
            }
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.cancel();
        }
    }
}

/// One live request to the relay
struct Connection {
    client: Client,
    endpoint: String,
    turn: TurnId,
    signals: mpsc::Sender<(TurnId, StreamSignal)>,
}

impl Connection {
    async fn run(self, question: String, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = self.read(&question) => {}
        }
    }

    async fn send(&self, signal: StreamSignal) -> bool {
        self.signals.send((self.turn, signal)).await.is_ok()
    }

    async fn read(&self, question: &str) {
        let response = match self
            .client
            .get(&self.endpoint)
            .query(&[("message", question)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Relay request failed");
                self.send(StreamSignal::TransportFailure).await;
                return;
            }
        };

        let status = response.status();
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !status.is_success() || !is_event_stream {
            let body = response.text().await.unwrap_or_default();
            let signal = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error) if !status.is_success() => StreamSignal::Error(error.error),
                _ => {
                    tracing::warn!(%status, "Relay answered without an event stream");
                    StreamSignal::TransportFailure
                }
            };
            self.send(signal).await;
            return;
        }

        let mut frames = std::pin::pin!(framing::frames(Box::pin(response.bytes_stream())));
        while let Some(frame) = frames.next().await {
            let chunk = match frame {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = %e, "Relay connection dropped");
                    self.send(StreamSignal::TransportFailure).await;
                    return;
                }
            };

            let data = match chunk.data() {
                Ok(Some(data)) => data,
                // Keep-alive comments
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable relay frame");
                    continue;
                }
            };

            match StreamEvent::parse(&data) {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    if !self.send(event.into()).await || terminal {
                        return;
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Skipping malformed relay event"),
            }
        }

        tracing::warn!("Relay stream ended without a terminal marker");
        self.send(StreamSignal::TransportFailure).await;
    }
}
