//! Terminal chat client for the RAG relay
//!
//! Reads questions from stdin, one per line, and prints each answer as it
//! streams in.

use rag_relay::consumer::{ChatSession, ConsumerError, Render, Turn, TurnId};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/chat";

/// Prints only the part of the answer not yet on screen
#[derive(Default)]
struct TerminalRender {
    turn: Option<TurnId>,
    printed: usize,
    stdout_failed: bool,
}

fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

impl Render for TerminalRender {
    fn render(&mut self, turn: &Turn) {
        if self.turn != Some(turn.id()) {
            self.turn = Some(turn.id());
            self.printed = 0;
        }

        let answer = turn.answer_markdown();
        if let Some(fresh) = answer.get(self.printed..) {
            if let Err(e) = write_stdout(fresh) {
                // Render cannot fail the session; report the first failure only
                if !self.stdout_failed {
                    self.stdout_failed = true;
                    tracing::warn!(error = %e, "Failed to write answer to stdout");
                }
            }
        }
        self.printed = answer.len();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_relay=warn,rag_chat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let endpoint =
        std::env::var("RAG_RELAY_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let mut session = ChatSession::new(endpoint)?;
    let mut render = TerminalRender::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    write_stdout("> ")?;
    while let Some(line) = lines.next_line().await? {
        match session.ask(&line, &mut render).await {
            Ok(turn) => {
                let latency = turn
                    .latency()
                    .map_or(0, |d| d.num_milliseconds());
                write_stdout("\n")?;
                eprintln!("({latency} ms)");
            }
            Err(ConsumerError::Rejected(e)) => eprintln!("{e}"),
            Err(e) => return Err(e.into()),
        }
        write_stdout("> ")?;
    }

    Ok(())
}
