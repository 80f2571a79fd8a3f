use comms::{OnoSender, msg::Response};
use log::error;
use serde_json::Value;
use tokio::io::AsyncWrite;

use crate::{error::ErrorCode, shutdown::Shutdown};

/// Number of failed sends after which the worker gives up on the connection.
pub const MAX_FAILURE_THRESHOLD: usize = 5;

/// Writes responses and enforces the bounded send failure policy.
///
/// The failure counter lives as long as the sender: successful sends and new
/// connections do not reset it.
#[derive(Debug, Default)]
pub struct ResponseSender {
    send_failures: usize,
}

impl ResponseSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_failures(&self) -> usize {
        self.send_failures
    }

    /// Writes `response` to `tx`.
    ///
    /// A response that cannot be encoded is replaced by an `UnknownException`
    /// response; that is not a send failure. A failed write is logged and
    /// counted, it is not retried.
    ///
    /// # Errors
    /// Returns `Shutdown::SendFailsExceedsLimits` once `MAX_FAILURE_THRESHOLD`
    /// writes have failed.
    pub async fn send<W>(&mut self, tx: &mut OnoSender<W>, response: &Response) -> Result<(), Shutdown>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = match comms::encode(response) {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to encode response with code {}: {e}", response.code);
                let fallback = Response::new(
                    ErrorCode::UnknownException.as_u32(),
                    format!("Unknown error {e}"),
                    None,
                );

                match comms::encode(&fallback) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("failed to encode error response: {e}");
                        return Ok(());
                    }
                }
            }
        };

        let Err(e) = tx.send_frame(&frame).await else {
            return Ok(());
        };

        self.send_failures += 1;
        error!("{}: Send failed. {e:?}.\nMsg: {response:?}", ErrorCode::SendMsgFail);

        if self.send_failures >= MAX_FAILURE_THRESHOLD {
            error!(
                "{}: {} failed sends, giving up",
                ErrorCode::SendFailsExceedsLimits,
                self.send_failures
            );
            return Err(Shutdown::SendFailsExceedsLimits);
        }

        Ok(())
    }

    /// Builds a response and sends it.
    ///
    /// # Errors
    /// Propagates the fatal outcome of `send`.
    pub async fn create_and_send<W>(
        &mut self,
        tx: &mut OnoSender<W>,
        code: u32,
        message: impl Into<String>,
        predictions: Option<Value>,
    ) -> Result<(), Shutdown>
    where
        W: AsyncWrite + Unpin,
    {
        let response = Response::new(code, message, predictions);

        self.send(tx, &response).await.inspect_err(|shutdown| {
            error!("failed to send response with code {code}: {shutdown}");
        })
    }
}
