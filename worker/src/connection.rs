use std::io;

use comms::{OnoReceiver, OnoSender, msg::Request};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    command::Command,
    error::{ErrorCode, WorkerError},
    handlers::CommandHandlers,
    loader::ModelLoader,
    sender::ResponseSender,
    service_manager::ServiceRegistry,
    shutdown::Shutdown,
};

/// Serves requests from one frontend connection until it closes.
///
/// Each request gets exactly one response. A frame whose body is not a valid
/// request is answered with `UnknownCommand` and the loop keeps going; any
/// other receive failure ends the connection.
///
/// # Args
/// * `rx` - Receiving end of the frontend channel.
/// * `tx` - Sending end of the frontend channel.
/// * `handlers` - The command handlers that own the loaded models.
/// * `sender` - The response sender, which keeps the send failure count.
///
/// # Returns
/// `Ok(())` once the connection is gone.
///
/// # Errors
/// Returns `Shutdown::SendFailsExceedsLimits` when the worker must terminate.
pub async fn handle_connection<R, W, G, L>(
    mut rx: OnoReceiver<R>,
    mut tx: OnoSender<W>,
    handlers: &mut CommandHandlers<G, L>,
    sender: &mut ResponseSender,
) -> Result<(), Shutdown>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: ServiceRegistry,
    L: ModelLoader,
{
    loop {
        let request = match rx.recv::<Request>().await {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("received a malformed request: {e}");
                let code = ErrorCode::UnknownCommand.as_u32();
                sender
                    .create_and_send(&mut tx, code, format!("Unknown error {e:?}"), None)
                    .await?;
                continue;
            }
            Err(e) => {
                let closed = WorkerError::new(ErrorCode::ConnectionClosed, closed_reason(&e));
                info!("{closed}");
                return Ok(());
            }
        };

        debug!(command = request.command.as_str(); "received request");
        dispatch(&request, &mut tx, handlers, sender).await?;
    }
}

async fn dispatch<W, G, L>(
    request: &Request,
    tx: &mut OnoSender<W>,
    handlers: &mut CommandHandlers<G, L>,
    sender: &mut ResponseSender,
) -> Result<(), Shutdown>
where
    W: AsyncWrite + Unpin,
    G: ServiceRegistry,
    L: ModelLoader,
{
    let outcome = match Command::parse(&request.command) {
        Command::Predict => handlers
            .predict(&request.payload)
            .map(|(predictions, msg, code)| (code, msg, Some(predictions))),
        Command::Load => handlers
            .load_model(&request.payload)
            .map(|(msg, code)| (code, msg, None)),
        Command::Unload => handlers
            .unload_model(&request.payload)
            .map(|(msg, code)| (code, msg, None)),
        Command::Unknown => Err(WorkerError::new(
            ErrorCode::UnknownCommand,
            format!("Received unknown command: {}", request.command),
        )),
    };

    let (code, message, predictions): (u32, String, Option<Value>) = match outcome {
        Ok(ok) => ok,
        Err(e) => {
            error!("{e}");
            (e.code().as_u32(), e.message().to_string(), None)
        }
    };

    sender.create_and_send(tx, code, message, predictions).await
}

fn closed_reason(e: &io::Error) -> String {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => "Frontend closed the connection".to_string(),
        io::ErrorKind::InvalidInput => format!("Frontend sent an unreadable frame: {e}"),
        _ => format!("Connection lost: {e}"),
    }
}
