use {
    super::MAX_MESSAGE_SIZE,
    crate::ComError,
    futures_util::{SinkExt, StreamExt},
    serde::{Serialize, de::DeserializeOwned},
    std::{collections::HashMap, net::SocketAddr, sync::Arc},
    tokio::{
        net::{TcpListener, TcpStream, ToSocketAddrs},
        sync::{RwLock, mpsc},
        task::JoinHandle,
    },
    tokio_websockets::{Message, ServerBuilder, WebSocketStream},
};

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = futures_util::stream::SplitStream<WebSocketStream<TcpStream>>;
type Clients = Arc<RwLock<HashMap<SocketAddr, WsSink>>>;

/// Websocket server decoding JSON messages of type `T` from any client and
/// broadcasting to all of them.
pub struct WsServer<T> {
    clients: Clients,
    rx: mpsc::Receiver<Result<T, ComError>>,
    accept_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl<T: DeserializeOwned + Send + 'static> WsServer<T> {
    /// Bind a TCP listener and start accepting websocket connections.
    ///
    /// A background task performs the handshake for each connection, keeps
    /// the write half in the client map and spawns a reader task that feeds
    /// decoded messages into `recv`.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, ComError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let clients: Clients = Arc::new(RwLock::new(HashMap::new()));
        let (tx, rx) = mpsc::channel(256);

        let accept_task = tokio::spawn({
            let clients = Arc::clone(&clients);
            async move {
                loop {
                    let (tcp_stream, addr) = match listener.accept().await {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            log::warn!("accept error: {}", e);
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            continue;
                        }
                    };
                    let ws_stream = match ServerBuilder::new().accept(tcp_stream).await {
                        Ok((_request, ws_stream)) => ws_stream,
                        Err(e) => {
                            log::warn!("websocket handshake failed for {}: {}", addr, e);
                            continue;
                        }
                    };
                    log::info!("client {} connected", addr);
                    let (write_half, read_half) = ws_stream.split();
                    clients.write().await.insert(addr, write_half);
                    tokio::spawn(read_client(
                        addr,
                        read_half,
                        tx.clone(),
                        Arc::clone(&clients),
                    ));
                }
            }
        });

        Ok(Self {
            clients,
            rx,
            accept_task,
            local_addr,
        })
    }

    /// Receive the next message from any connected client.
    ///
    /// A message that is too large or does not decode comes back as
    /// `MessageTooLarge` or `Json`; the client stays connected.
    /// `ConnectionClosed` means the server can receive nothing more.
    pub async fn recv(&mut self) -> Result<T, ComError> {
        self.rx
            .recv()
            .await
            .unwrap_or(Err(ComError::ConnectionClosed))
    }
}

impl<T> WsServer<T> {
    /// Broadcast `value` as a JSON text message.
    pub async fn send_json<S: Serialize>(&self, value: &S) -> Result<(), ComError> {
        let text = serde_json::to_string(value)?;
        self.broadcast(Message::text(text)).await;
        Ok(())
    }

    /// Broadcast an opaque binary message.
    pub async fn send_binary(&self, payload: Vec<u8>) {
        self.broadcast(Message::binary(payload)).await;
    }

    // clients that fail to receive are dropped from the map
    async fn broadcast(&self, msg: Message) {
        let mut lock = self.clients.write().await;
        let mut failed = Vec::new();
        for (addr, writer) in lock.iter_mut() {
            if let Err(e) = writer.send(msg.clone()).await {
                log::warn!("failed to send to {}: {}", addr, e);
                failed.push(*addr);
            }
        }
        for addr in failed {
            lock.remove(&addr);
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl<T> Drop for WsServer<T> {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn read_client<T: DeserializeOwned>(
    addr: SocketAddr,
    mut reader: WsStream,
    tx: mpsc::Sender<Result<T, ComError>>,
    clients: Clients,
) {
    loop {
        match reader.next().await {
            Some(Ok(msg)) => {
                if !msg.is_text() && !msg.is_binary() {
                    continue;
                }
                let payload = msg.into_payload();
                let decoded = if payload.len() > MAX_MESSAGE_SIZE {
                    log::warn!("message from {} too large: {} bytes", addr, payload.len());
                    Err(ComError::MessageTooLarge(payload.len()))
                } else {
                    serde_json::from_slice::<T>(&payload).map_err(|e| {
                        log::warn!("undecodable message from {}: {}", addr, e);
                        ComError::Json(e)
                    })
                };
                if tx.send(decoded).await.is_err() {
                    // server dropped
                    break;
                }
            }
            Some(Err(e)) => {
                log::warn!("client {} error: {}", addr, e);
                break;
            }
            None => {
                log::info!("client {} disconnected", addr);
                break;
            }
        }
    }
    clients.write().await.remove(&addr);
}
