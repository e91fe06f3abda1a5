//! Interactive request loop.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::info;
use twin_store::StoreError;

pub const PROMPT: &str = "Please enter your request (or type 'exit'): ";
pub const GOODBYE: &str = "Exiting the program.";

/// Something that answers one request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// `Ok(None)` means the request failed and was logged.
    async fn handle(
        &self,
        text: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, StoreError>;
}

/// Why the loop stopped.
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("thread store failed: {0}")]
    Store(#[from] StoreError),
}

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Read requests until `exit`, end of input, or Ctrl-C at the prompt.
///
/// Ctrl-C while a request is in flight cancels that request only.
pub async fn run<H, R, W>(handler: &H, input: R, output: &mut W) -> Result<(), ReplError>
where
    H: RequestHandler + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            Ok(()) = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            // End of input; finish the prompt line first.
            output.write_all(b"\n").await?;
            break;
        };
        if is_exit(&line) {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let reply = ask(handler, text).await?;
        let rendered = match reply {
            Some(reply) => format!("Assistant: {reply}\n"),
            None => "No reply; see the log for details.\n".to_string(),
        };
        output.write_all(rendered.as_bytes()).await?;
    }

    output.write_all(format!("{GOODBYE}\n").as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Run one request, cancelling its wait on Ctrl-C.
pub async fn ask<H>(handler: &H, text: &str) -> Result<Option<String>, StoreError>
where
    H: RequestHandler + ?Sized,
{
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let request = handler.handle(text, &mut cancel_rx);
    tokio::pin!(request);

    tokio::select! {
        reply = &mut request => reply,
        Ok(()) = tokio::signal::ctrl_c() => {
            info!("cancelling request");
            let _ = cancel_tx.send(true);
            request.await
        }
    }
}
