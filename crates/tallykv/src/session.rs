//! Interactive command loop.
//!
//! Reads one command per line, runs it against the store and writes the
//! reply. The loop ends on `END`, at end of input, or when the shutdown
//! future resolves; each path saves the store first, which leaves the
//! backing file untouched if a transaction is still open.

use crate::command::{self, Command, Reply};
use crate::error::SessionError;
use crate::store::Store;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

/// Message written when the session is interrupted.
pub const INTERRUPT_MESSAGE: &str = "\nInterrupted. Saving changes unless in transaction.\n";

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `END` was received
    Ended,
    /// Input was exhausted
    EndOfInput,
    /// The shutdown signal fired
    Interrupted,
}

/// Run the command loop until it ends.
///
/// `prompt` is written (and flushed) before each line is read. Save
/// failures on `COMMIT` are logged and the loop continues; a failed save
/// while ending is returned.
///
/// # Errors
///
/// Returns `SessionError` if reading input or writing replies fails, or if
/// the final save fails.
pub async fn run<R, W, S>(
    store: &mut Store,
    input: R,
    mut output: W,
    prompt: Option<&str>,
    shutdown: S,
) -> Result<SessionEnd, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        if let Some(prompt) = prompt {
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;
        }

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => {
                output.write_all(INTERRUPT_MESSAGE.as_bytes()).await?;
                output.flush().await?;
                store.save()?;
                info!("Session interrupted");
                return Ok(SessionEnd::Interrupted);
            }
        };

        let Some(line) = line else {
            debug!("End of input");
            store.save()?;
            return Ok(SessionEnd::EndOfInput);
        };

        let reply = match line.parse::<Command>() {
            Ok(command) => {
                let ending = command == Command::End;
                match command::execute(store, command) {
                    Ok(reply) => reply,
                    Err(e) if ending => return Err(e.into()),
                    Err(e) => {
                        error!("{e}");
                        Reply::Silent
                    }
                }
            }
            Err(e) => {
                warn!("Rejected input {line:?}");
                Reply::from(e)
            }
        };

        if let Some(text) = reply.render() {
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;

        if reply.is_stop() {
            return Ok(SessionEnd::Ended);
        }
    }
}
