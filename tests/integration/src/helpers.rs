//! Test helpers for integration tests
//!
//! Provides a gateway bound to an ephemeral port, a WebSocket client that
//! speaks JSON frames, and HTTP helpers for the admin routes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_common::{RelayConfig, TrustedAuthenticator};
use relay_gateway::server::{create_app, create_memory_state, GatewayState};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long to wait for an expected frame or condition
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: GatewayState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a gateway with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with(RelayConfig::default()).await
    }

    /// Start a gateway with custom routing settings
    pub async fn start_with(relay: RelayConfig) -> Result<Self> {
        let state = create_memory_state(Arc::new(TrustedAuthenticator), relay);
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(RECV_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, user_id: &str, resume: bool) -> String {
        format!("ws://{}/ws?user_id={user_id}&resume={resume}", self.addr)
    }

    /// Open a WebSocket without waiting for registration
    pub async fn connect_raw(&self, url: &str) -> Result<WsClient> {
        let (stream, _) = connect_async(url).await?;
        Ok(WsClient { stream })
    }

    /// Connect as a user and wait until the connection is routable
    pub async fn connect(&self, user_id: &str) -> Result<WsClient> {
        self.connect_as(user_id, false).await
    }

    /// Connect as a user with the offline queue delivered on arrival
    pub async fn connect_resume(&self, user_id: &str) -> Result<WsClient> {
        self.connect_as(user_id, true).await
    }

    async fn connect_as(&self, user_id: &str, resume: bool) -> Result<WsClient> {
        let connections = self.state.router().connections().clone();
        let previous = connections.get(user_id).map(|c| c.session_id().to_string());

        let client = self.connect_raw(&self.ws_url(user_id, resume)).await?;

        let user = user_id.to_string();
        eventually(move || {
            connections.get(&user).is_some_and(|c| {
                c.is_active() && Some(c.session_id()) != previous.as_deref()
            })
        })
        .await
        .with_context(|| format!("{user_id} never became active"))?;

        Ok(client)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.state.router().connections().contains(user_id)
    }

    /// Wait until a user is no longer registered
    pub async fn wait_offline(&self, user_id: &str) -> Result<()> {
        let connections = self.state.router().connections().clone();
        let user = user_id.to_string();
        eventually(move || !connections.contains(&user))
            .await
            .with_context(|| format!("{user_id} never went offline"))
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }
}

/// Poll a condition until it holds or the receive timeout passes
pub async fn eventually<F>(mut condition: F) -> Result<()>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("condition not met within {RECV_TIMEOUT:?}")
}

/// WebSocket client exchanging JSON frames
pub struct WsClient {
    stream: WsStream,
}

impl WsClient {
    /// Send one JSON frame
    pub async fn send_json(&mut self, frame: Value) -> Result<()> {
        self.stream.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Send a frame requesting an ack and wait for the gateway's `__ack__`.
    ///
    /// Returns once the gateway has fully processed the frame.
    pub async fn send_acked(&mut self, mut frame: Value, ack_id: &str) -> Result<()> {
        frame["ack"] = Value::Bool(true);
        frame["ack_id"] = Value::String(ack_id.to_string());
        self.send_json(frame).await?;

        let reply = self.recv_json().await?;
        if reply["event"] != "__ack__" || reply["ack_id"] != ack_id {
            bail!("expected ack {ack_id}, got {reply}");
        }
        Ok(())
    }

    /// Receive the next JSON frame, skipping control frames
    pub async fn recv_json(&mut self) -> Result<Value> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?;

            match next {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => bail!("connection closed: {frame:?}"),
                Some(Ok(other)) => bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => bail!("stream ended"),
            }
        }
    }

    /// Read until the close frame and return its code
    pub async fn recv_close(&mut self) -> Result<Option<u16>> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for close")?;

            match next {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    /// Assert that no data frame arrives for a while; control frames are
    /// answered as usual
    pub async fn expect_silence(&mut self, duration: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(()),
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
                Ok(Some(Ok(Message::Text(text)))) => bail!("unexpected frame: {text}"),
                Ok(other) => bail!("unexpected stream item: {other:?}"),
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
