//! Client half of the remote display.
//!
//! Every [`ControlDevice`] call becomes one RPC request to a
//! [`RemoteProxy`](crate::rpc::RemoteProxy), awaited under the call
//! deadline. Errors raised by the proxy come back as
//! [`ScreenError::Remote`] carrying the proxy's message.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use image::RgbaImage;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use crate::device::ControlDevice;
use crate::error::ScreenError;
use crate::rpc::{
    COMMAND_RESTART, COMMAND_SHUTDOWN, COMMAND_STARTUP, Call, DrawBitmapRequest, Message,
    RpcCodec, SetRotateRequest,
};

pub struct RemoteClient {
    framed: Framed<TcpStream, RpcCodec>,
    addr: String,
    next_id: u64,
    timeout: Duration,
}

impl RemoteClient {
    /// Connect to the proxy at `addr`, waiting at most `timeout`.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ScreenError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ScreenError::Timeout(timeout))??;
        stream.set_nodelay(true)?;
        info!(addr, "connected to remote display");

        Ok(Self {
            framed: Framed::new(stream, RpcCodec),
            addr: addr.to_string(),
            next_id: 1,
            timeout,
        })
    }

    /// Proxy address this client talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send `call` and wait for its response.
    pub async fn call(&mut self, call: Call) -> Result<(), ScreenError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let method = call.method();
        debug!(id, method, "remote call");

        let deadline = self.timeout;
        tokio::time::timeout(deadline, self.round_trip(id, call))
            .await
            .map_err(|_| ScreenError::Timeout(deadline))?
    }

    async fn round_trip(&mut self, id: u64, call: Call) -> Result<(), ScreenError> {
        self.framed.send(Message::Request { id, call }).await?;

        loop {
            match self.framed.next().await {
                None => {
                    return Err(ScreenError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "proxy closed the connection",
                    )));
                }
                Some(Err(e)) => return Err(e),
                Some(Ok(Message::Response { id: got, error })) if got == id => {
                    return match error {
                        None => Ok(()),
                        Some(msg) => Err(ScreenError::Remote(msg)),
                    };
                }
                // Late answer to a call that already timed out.
                Some(Ok(other)) => debug!(id = other.id(), "discarding stale message"),
            }
        }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("addr", &self.addr)
            .field("next_id", &self.next_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl ControlDevice for RemoteClient {
    async fn startup(&mut self) -> Result<(), ScreenError> {
        self.call(Call::Command(COMMAND_STARTUP.into())).await
    }

    async fn shutdown(&mut self) -> Result<(), ScreenError> {
        self.call(Call::Command(COMMAND_SHUTDOWN.into())).await
    }

    async fn restart(&mut self) -> Result<(), ScreenError> {
        self.call(Call::Command(COMMAND_RESTART.into())).await
    }

    async fn set_light(&mut self, light: u8) -> Result<(), ScreenError> {
        self.call(Call::SetLight(light)).await
    }

    async fn set_mirror(&mut self, mirror: bool) -> Result<(), ScreenError> {
        self.call(Call::SetMirror(mirror)).await
    }

    async fn set_rotate(&mut self, landscape: bool, invert: bool) -> Result<(), ScreenError> {
        self.call(Call::SetRotate(SetRotateRequest { landscape, invert }))
            .await
    }

    async fn draw_bitmap(
        &mut self,
        x: u16,
        y: u16,
        image: &RgbaImage,
    ) -> Result<(), ScreenError> {
        let req = DrawBitmapRequest::new(x, y, image)?;
        self.call(Call::DrawBitmap(req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A one-shot server answering every request with `reply(id)`.
    async fn scripted_server<F>(reply: F) -> String
    where
        F: Fn(u64) -> Option<Message> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, RpcCodec);
            while let Some(Ok(msg)) = framed.next().await {
                if let Some(answer) = reply(msg.id()) {
                    if framed.send(answer).await.is_err() {
                        break;
                    }
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn remote_error_is_surfaced() {
        let addr = scripted_server(|id| {
            Some(Message::Response {
                id,
                error: Some("panel unplugged".into()),
            })
        })
        .await;

        let mut client = RemoteClient::connect(&addr, Duration::from_secs(5))
            .await
            .unwrap();
        let err = client.set_light(10).await.unwrap_err();
        assert!(matches!(err, ScreenError::Remote(ref m) if m == "panel unplugged"));
    }

    #[tokio::test]
    async fn stale_responses_are_skipped() {
        let addr = scripted_server(|id| {
            // Odd ids only ever get an answer for some other call.
            if id % 2 == 1 {
                Some(Message::Response { id: 0, error: None })
            } else {
                Some(Message::Response { id, error: None })
            }
        })
        .await;

        let mut client = RemoteClient::connect(&addr, Duration::from_millis(200))
            .await
            .unwrap();
        let err = client.startup().await.unwrap_err();
        assert!(matches!(err, ScreenError::Timeout(_)));
        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn silent_proxy_times_out() {
        let addr = scripted_server(|_| None).await;
        let mut client = RemoteClient::connect(&addr, Duration::from_millis(100))
            .await
            .unwrap();
        let err = client.restart().await.unwrap_err();
        assert!(matches!(err, ScreenError::Timeout(d) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = RemoteClient::connect(&addr, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ScreenError::Io(_)));
    }
}
