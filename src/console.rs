//! Terminal front end
//!
//! Drives a `Conversation` from line-oriented input. Rendering goes through
//! a shared writer so the same loop serves stdout and in-memory buffers.

use crate::audit::ResolutionLog;
use crate::conversation::{Conversation, ConversationTurn, SubmitOutcome, SubmitRejection};
use crate::models::Mode;
use crate::pipeline::Pipelines;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

pub const HELP_TEXT: &str = "Commands: /mode [sentinel|discovery|auto], /transcript, /quit";

/// Shared sink for rendered output
pub type Output = Arc<Mutex<dyn Write + Send>>;

fn emit(out: &Output, text: &str) {
    match out.lock() {
        Ok(mut writer) => {
            if let Err(e) = writeln!(writer, "{}", text).and_then(|_| writer.flush()) {
                warn!(error = %e, "Console write failed");
            }
        }
        Err(_) => warn!("Console output lock poisoned"),
    }
}

pub fn render(out: &Output, turn: &ConversationTurn) {
    match turn.payload() {
        Some(result) => emit(out, &result.to_markdown()),
        None => emit(out, turn.content()),
    }
}

/// Resolve one query through a fresh session and render the reply.
///
/// Goes through the same input bounds and failure turn as the interactive
/// loop, with `mode` pinned when given.
pub async fn single_shot(
    pipelines: Arc<Pipelines>,
    mode: Option<Mode>,
    query: &str,
    out: &Output,
) -> Result<ConversationTurn, SubmitRejection> {
    let conversation = Conversation::new(Uuid::new_v4(), pipelines, Arc::new(ResolutionLog::new()));
    conversation.set_mode(mode).await;

    match conversation.submit(query).await {
        SubmitOutcome::Replied(turn) => {
            render(out, &turn);
            Ok(turn)
        }
        SubmitOutcome::Rejected(rejection) => Err(rejection),
    }
}

/// Interactive loop until `/quit` or end of input.
///
/// Turns run in the background so typing while one resolves is refused by
/// the session. Every accepted turn is awaited before returning.
pub async fn repl<R>(conversation: Arc<Conversation>, input: R, out: Output) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    for turn in conversation.transcript().await {
        render(&out, &turn);
    }
    emit(&out, HELP_TEXT);

    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let mut parts = command.split_whitespace();
            match parts.next().unwrap_or_default().to_lowercase().as_str() {
                "quit" | "exit" => break,
                "transcript" => emit(&out, conversation.transcript_text().await.trim_end()),
                "mode" => mode_command(&conversation, parts.next(), &out).await,
                other => emit(&out, &format!("Unknown command '/{}'", other)),
            }
            continue;
        }

        let conversation = conversation.clone();
        let out = out.clone();
        let text = input.to_string();
        in_flight.spawn(async move {
            match conversation.submit(&text).await {
                SubmitOutcome::Replied(turn) => render(&out, &turn),
                SubmitOutcome::Rejected(rejection) => emit(&out, &format!("({})", rejection)),
            }
        });
    }

    if !in_flight.is_empty() {
        debug!(pending = in_flight.len(), "Waiting for in-flight turns");
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Turn task failed");
        }
    }

    Ok(())
}

async fn mode_command(conversation: &Conversation, arg: Option<&str>, out: &Output) {
    match arg {
        None => match conversation.mode().await {
            Some(mode) => emit(out, &format!("Mode: {}", mode)),
            None => emit(out, "Mode: auto"),
        },
        Some(arg) if arg.eq_ignore_ascii_case("auto") => {
            conversation.set_mode(None).await;
            emit(out, "Mode: auto");
        }
        Some(arg) => match arg.parse::<Mode>() {
            Ok(mode) => {
                conversation.set_mode(Some(mode)).await;
                emit(out, &format!("Mode: {}", mode));
            }
            Err(e) => emit(out, &e),
        },
    }
}
