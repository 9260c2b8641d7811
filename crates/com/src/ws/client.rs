use {
    super::MAX_MESSAGE_SIZE,
    crate::ComError,
    futures_util::{SinkExt, StreamExt},
    serde::{Serialize, de::DeserializeOwned},
    std::net::SocketAddr,
    tokio_websockets::{ClientBuilder, MaybeTlsStream, Message, WebSocketStream},
};

/// What a client received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming<T> {
    Json(T),
    Binary(Vec<u8>),
}

/// Websocket client speaking JSON, used by tools and tests to drive a
/// `WsServer`.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ComError> {
        let uri: http::Uri = format!("ws://{}", addr).parse().map_err(|e| {
            ComError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid websocket uri: {e}"),
            ))
        })?;
        let (stream, _response) = ClientBuilder::from_uri(uri).connect().await?;
        Ok(Self { stream })
    }

    /// Send `value` as a JSON text message.
    pub async fn send_json<S: Serialize>(&mut self, value: &S) -> Result<(), ComError> {
        let text = serde_json::to_string(value)?;
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    /// Receive the next text or binary message. Control frames are skipped.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Incoming<T>, ComError> {
        loop {
            match self.stream.next().await {
                Some(Ok(msg)) => {
                    let is_text = msg.is_text();
                    if !is_text && !msg.is_binary() {
                        continue;
                    }
                    let payload = msg.into_payload();
                    if payload.len() > MAX_MESSAGE_SIZE {
                        return Err(ComError::MessageTooLarge(payload.len()));
                    }
                    return if is_text {
                        Ok(Incoming::Json(serde_json::from_slice(&payload)?))
                    } else {
                        Ok(Incoming::Binary(payload.to_vec()))
                    };
                }
                Some(Err(e)) => return Err(ComError::from(e)),
                None => return Err(ComError::ConnectionClosed),
            }
        }
    }
}
