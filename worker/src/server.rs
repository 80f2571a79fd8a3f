use std::{
    fs, io,
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
    time::Duration,
};

use log::{error, info};
use tokio::{
    net::{TcpListener, TcpSocket, TcpStream, UnixListener, UnixSocket, UnixStream},
    time,
};

use crate::{
    config::{SocketKind, WorkerConfig},
    connection,
    error::{ErrorCode, Result, WorkerError},
    handlers::CommandHandlers,
    loader::ModelLoader,
    sender::ResponseSender,
    service_manager::ServiceRegistry,
    shutdown::Shutdown,
};

const LISTEN_BACKLOG: u32 = 1;

/// A created but not yet bound socket.
enum Socket {
    Unix { socket: UnixSocket, path: PathBuf },
    Tcp { socket: TcpSocket, addr: SocketAddr },
}

enum Listener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

enum Connection {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Socket {
    fn bind_and_listen(self) -> Result<Listener> {
        match self {
            Self::Unix { socket, path } => {
                socket.bind(&path).map_err(|e| bind_error(path.display(), e))?;
                let listener = socket.listen(LISTEN_BACKLOG).map_err(unknown)?;
                Ok(Listener::Unix(listener))
            }
            Self::Tcp { socket, addr } => {
                socket.set_reuseaddr(true).map_err(unknown)?;
                socket.bind(addr).map_err(|e| bind_error(addr, e))?;
                let listener = socket.listen(LISTEN_BACKLOG).map_err(unknown)?;
                Ok(Listener::Tcp(listener))
            }
        }
    }
}

impl Listener {
    async fn accept(&self) -> io::Result<Connection> {
        match self {
            Self::Unix(listener) => listener.accept().await.map(|(s, _)| Connection::Unix(s)),
            Self::Tcp(listener) => listener.accept().await.map(|(s, _)| Connection::Tcp(s)),
        }
    }
}

/// Backend worker that serves model commands from a single frontend.
pub struct ModelServiceWorker<G, L> {
    socket: Socket,
    debug: bool,
    accept_timeout: Duration,
    handlers: CommandHandlers<G, L>,
    sender: ResponseSender,
}

impl<G, L> ModelServiceWorker<G, L>
where
    G: ServiceRegistry,
    L: ModelLoader,
{
    /// Creates the worker and its listening socket.
    ///
    /// For unix sockets a stale socket file at the path is removed first.
    ///
    /// # Args
    /// * `config` - Transport, address and runtime flags.
    /// * `handlers` - The command handlers to serve with.
    ///
    /// # Errors
    /// * `IncompleteData` if the address is empty.
    /// * `SocketInUse` if a stale unix socket cannot be removed.
    /// * `SocketError` if the socket cannot be created.
    /// * `UnknownException` if the TCP address does not resolve.
    pub fn new(config: WorkerConfig, handlers: CommandHandlers<G, L>) -> Result<Self> {
        let address = config.address();
        if address.is_empty() {
            return Err(WorkerError::new(
                ErrorCode::IncompleteData,
                "Incomplete data provided",
            ));
        }

        let socket = match config.kind() {
            SocketKind::Unix => {
                let path = PathBuf::from(address);
                unlink_stale(&path, address)?;
                let socket = UnixSocket::new_stream().map_err(|e| socket_error(address, e))?;
                Socket::Unix { socket, path }
            }
            SocketKind::Tcp => {
                let addr = resolve(config.host(), config.port(), address)?;
                let socket = match addr {
                    SocketAddr::V4(_) => TcpSocket::new_v4(),
                    SocketAddr::V6(_) => TcpSocket::new_v6(),
                }
                .map_err(|e| socket_error(address, e))?;
                Socket::Tcp { socket, addr }
            }
        };

        info!("Listening on port: {address}");

        Ok(Self {
            socket,
            debug: config.debug(),
            accept_timeout: config.accept_timeout(),
            handlers,
            sender: ResponseSender::new(),
        })
    }

    /// Binds, listens and serves connections until a terminal state is reached.
    ///
    /// Only the first accept is bounded by the accept timeout. Outside debug
    /// mode the worker returns after the first connection ends.
    ///
    /// # Returns
    /// The `Shutdown` state the worker ended in.
    ///
    /// # Errors
    /// * `SocketBindError` if the socket cannot be bound.
    /// * `UnknownException` if listening or accepting fails.
    pub async fn run(self) -> Result<Shutdown> {
        let Self {
            socket,
            debug,
            accept_timeout,
            mut handlers,
            mut sender,
        } = self;

        let listener = socket.bind_and_listen()?;
        info!("Waiting for a connection");

        let first = time::timeout(accept_timeout, listener.accept()).await;
        let Ok(mut accepted) = first else {
            error!("Backend worker did not receive connection from frontend");
            return Ok(Shutdown::NoFrontend);
        };

        loop {
            let conn = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    if debug {
                        error!("Backend worker error {e}");
                    }
                    return Err(unknown(e));
                }
            };

            info!("Connection accepted");
            if let Err(shutdown) = serve(conn, &mut handlers, &mut sender).await {
                return Ok(shutdown);
            }

            if !debug {
                return Ok(Shutdown::Served);
            }

            info!("Waiting for a connection");
            accepted = listener.accept().await;
        }
    }
}

async fn serve<G, L>(
    conn: Connection,
    handlers: &mut CommandHandlers<G, L>,
    sender: &mut ResponseSender,
) -> std::result::Result<(), Shutdown>
where
    G: ServiceRegistry,
    L: ModelLoader,
{
    match conn {
        Connection::Unix(stream) => {
            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            connection::handle_connection(rx, tx, handlers, sender).await
        }
        Connection::Tcp(stream) => {
            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            connection::handle_connection(rx, tx, handlers, sender).await
        }
    }
}

fn unlink_stale(path: &std::path::Path, address: &str) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => Err(WorkerError::new(
            ErrorCode::SocketInUse,
            format!("socket already in use: {address}."),
        )),
    }
}

fn resolve(host: &str, port: Option<u16>, address: &str) -> Result<SocketAddr> {
    let port = match port {
        Some(port) => port,
        None => address.trim().parse().map_err(|e| {
            WorkerError::new(ErrorCode::UnknownException, format!("{e:?}"))
        })?,
    };

    (host, port)
        .to_socket_addrs()
        .map_err(unknown)?
        .next()
        .ok_or_else(|| {
            WorkerError::new(
                ErrorCode::UnknownException,
                format!("could not resolve {host}:{port}"),
            )
        })
}

fn socket_error(address: &str, e: io::Error) -> WorkerError {
    WorkerError::new(
        ErrorCode::SocketError,
        format!("Socket error in init {address}. {e:?}"),
    )
}

fn bind_error(address: impl std::fmt::Display, e: io::Error) -> WorkerError {
    WorkerError::new(
        ErrorCode::SocketBindError,
        format!("Socket bind error {address}. {e:?}"),
    )
}

fn unknown(e: io::Error) -> WorkerError {
    WorkerError::new(ErrorCode::UnknownException, format!("{e:?}"))
}
