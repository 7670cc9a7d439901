use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::client::{Client, ClientRegistry};
use crate::protocol::message::leave_notice;
use crate::protocol::{FrameEvent, FrameReader, Message, MessageKind, write_frame};
use crate::router::Router;

/// How long queued frames may take to flush once a session has ended.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What the session does after one frame.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Leave,
}

/// Runs one participant's session until it disconnects.
///
/// - Reads newline-delimited frames from `read_half`.
/// - Moves the client from connected to joined on its first join frame.
/// - Routes joined clients' frames to everyone else.
/// - Spawns a writer draining the client's outbound queue into `write_half`.
/// - Always removes the client from `registry` before returning.
pub async fn handle_client<R, W>(
    read_half: R,
    write_half: W,
    client: Arc<Client>,
    outbound_rx: mpsc::Receiver<String>,
    registry: ClientRegistry,
    router: Router,
    max_frame_length: usize,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let id = client.id();
    let mut writer = tokio::spawn(write_outbound(write_half, outbound_rx, Arc::clone(&client)));
    let mut frames = FrameReader::new(BufReader::new(read_half), max_frame_length);
    let mut announced_leave = false;

    loop {
        let event = tokio::select! {
            event = frames.next_event() => event,
            _ = client.outbound().closed() => {
                info!("Session {} evicted", id);
                break;
            }
        };

        match event {
            Ok(FrameEvent::Frame(text)) => {
                if handle_frame(&client, &router, text).await == Flow::Leave {
                    announced_leave = true;
                    info!("Session {} left", id);
                    break;
                }
            }
            Ok(FrameEvent::Malformed(e)) => {
                warn!("Dropping frame from session {}: {}", id, e);
            }
            Ok(FrameEvent::EndOfStream) => {
                info!("Connection closed by session {}", id);
                break;
            }
            Err(e) => {
                info!("Session {} disconnected: {}", id, e);
                break;
            }
        }
    }

    registry.remove(id).await;

    if !announced_leave {
        if let Some(name) = client.display_name() {
            router.route(id, &leave_notice(name)).await;
        }
    }

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        debug!("Writer for session {} did not drain in time", id);
        writer.abort();
    }
    info!("Session {} ({}) closed", id, client.peer_addr());
}

/// Applies one frame to the session's state machine.
async fn handle_frame(client: &Client, router: &Router, text: String) -> Flow {
    let message = match Message::parse(client.id(), text, client.display_name()) {
        Ok(message) => message,
        Err(e) => {
            warn!("Dropping frame from session {}: {}", client.id(), e);
            return Flow::Continue;
        }
    };
    let id = message.sender();

    match (client.display_name(), message.kind()) {
        (None, MessageKind::Join { name }) => {
            client.set_display_name(name.clone());
            info!("Session {} joined as {}", id, name);
            router.route(id, &message.render(name)).await;
            Flow::Continue
        }
        (None, MessageKind::Leave) => Flow::Leave,
        (None, _) => {
            debug!("Dropping frame from session {} before join", id);
            Flow::Continue
        }
        (Some(name), MessageKind::Join { .. }) => {
            warn!("Session {} already joined as {}; ignoring join", id, name);
            Flow::Continue
        }
        (Some(name), MessageKind::Leave) => {
            router.route(id, &message.render(name)).await;
            Flow::Leave
        }
        (Some(name), _) => {
            debug!("Relaying from session {}: {}", id, message.raw());
            router.route(id, &message.render(name)).await;
            Flow::Continue
        }
    }
}

/// Drains the outbound queue to the socket until it is closed or a write fails.
///
/// A failed write closes the outbound path, which evicts the session.
async fn write_outbound<W>(mut write_half: W, mut outbound_rx: mpsc::Receiver<String>, client: Arc<Client>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut write_half, &payload).await {
            warn!("Failed to write to session {}: {}", client.id(), e);
            client.outbound().close();
            return;
        }
    }
    let _ = write_half.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Outbound, SessionId};
    use std::net::SocketAddr;
    use tokio::io::AsyncReadExt;

    fn client(id: u64) -> (Arc<Client>, mpsc::Receiver<String>) {
        let (outbound, rx) = Outbound::channel(8);
        let addr: SocketAddr = format!("127.0.0.1:{}", 7000 + id).parse().unwrap();
        (Arc::new(Client::new(SessionId::new(id), addr, outbound)), rx)
    }

    async fn setup() -> (Router, Arc<Client>, mpsc::Receiver<String>) {
        let registry = ClientRegistry::new(10);
        let router = Router::new(registry.clone());
        let (sender, _sender_rx) = client(1);
        let (peer, peer_rx) = client(2);
        registry.add(Arc::clone(&sender)).await.unwrap();
        registry.add(peer).await.unwrap();
        (router, sender, peer_rx)
    }

    #[tokio::test]
    async fn test_frames_before_join_are_dropped() {
        let (router, sender, mut peer_rx) = setup().await;

        let flow = handle_frame(&sender, &router, "C: test".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(peer_rx.try_recv().is_err());

        let flow = handle_frame(&sender, &router, "C is looking for a game!".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert!(peer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_sets_name_once_and_is_announced() {
        let (router, sender, mut peer_rx) = setup().await;

        handle_frame(&sender, &router, "joined:Alice".to_string()).await;
        handle_frame(&sender, &router, "joined:Mallory".to_string()).await;

        assert_eq!(sender.display_name(), Some("Alice"));
        assert_eq!(peer_rx.try_recv().unwrap(), "joined:Alice");
        assert!(peer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_joined_chat_and_seek_game_are_relayed() {
        let (router, sender, mut peer_rx) = setup().await;
        handle_frame(&sender, &router, "joined:Alice".to_string()).await;
        peer_rx.try_recv().unwrap();

        handle_frame(&sender, &router, "Alice: hi".to_string()).await;
        handle_frame(&sender, &router, "Alice is looking for a game!".to_string()).await;

        assert_eq!(peer_rx.try_recv().unwrap(), "Alice: hi");
        assert_eq!(
            peer_rx.try_recv().unwrap(),
            "Alice is looking for a game!"
        );
    }

    #[tokio::test]
    async fn test_chat_ending_in_suffix_keeps_session_open() {
        let (router, sender, mut peer_rx) = setup().await;
        handle_frame(&sender, &router, "joined:Alice".to_string()).await;
        peer_rx.try_recv().unwrap();

        let flow = handle_frame(&sender, &router, "Alice: did you see Bob has left".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(peer_rx.try_recv().unwrap(), "Alice: did you see Bob has left");

        let flow =
            handle_frame(&sender, &router, "Alice: Bob is looking for a game!".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(peer_rx.try_recv().unwrap(), "Alice: Bob is looking for a game!");

        let flow = handle_frame(&sender, &router, "Bob has left".to_string()).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(peer_rx.try_recv().unwrap(), "Alice: Bob has left");
    }

    #[tokio::test]
    async fn test_leave_ends_session() {
        let (router, sender, mut peer_rx) = setup().await;

        assert_eq!(
            handle_frame(&sender, &router, " has left".to_string()).await,
            Flow::Leave
        );
        assert!(peer_rx.try_recv().is_err());

        handle_frame(&sender, &router, "joined:Alice".to_string()).await;
        peer_rx.try_recv().unwrap();
        assert_eq!(
            handle_frame(&sender, &router, "Alice has left".to_string()).await,
            Flow::Leave
        );
        assert_eq!(peer_rx.try_recv().unwrap(), "Alice has left");
    }

    #[tokio::test]
    async fn test_broken_pipe_evicts_only_that_session() {
        let registry = ClientRegistry::new(10);
        let router = Router::new(registry.clone());
        let (broken, broken_rx) = client(1);
        let (sender, _sender_rx) = client(2);
        let (other, mut other_rx) = client(3);
        for c in [&broken, &sender, &other] {
            registry.add(Arc::clone(c)).await.unwrap();
        }

        // Inbound side stays open; outbound peer is gone.
        let (_inbound_tx, inbound_rx) = tokio::io::duplex(64);
        let (outbound_tx, outbound_peer) = tokio::io::duplex(64);
        drop(outbound_peer);

        let session = tokio::spawn(handle_client(
            inbound_rx,
            outbound_tx,
            Arc::clone(&broken),
            broken_rx,
            registry.clone(),
            router.clone(),
            64,
        ));

        router.route(sender.id(), "Bob: first").await;

        tokio::time::timeout(Duration::from_secs(3), session)
            .await
            .expect("session should end after a failed write")
            .unwrap();
        assert!(!registry.contains(broken.id()).await);
        assert!(broken.outbound().is_closed());

        router.route(sender.id(), "Bob: second").await;
        assert_eq!(other_rx.try_recv().unwrap(), "Bob: first");
        assert_eq!(other_rx.try_recv().unwrap(), "Bob: second");
    }

    #[tokio::test]
    async fn test_stuck_writer_is_aborted_after_drain_timeout() {
        let registry = ClientRegistry::new(10);
        let router = Router::new(registry.clone());
        let (stuck, stuck_rx) = client(1);
        registry.add(Arc::clone(&stuck)).await.unwrap();

        let (inbound_tx, inbound_rx) = tokio::io::duplex(64);
        // Tiny pipe whose peer never reads: the writer blocks on the first frame.
        let (outbound_tx, mut outbound_peer) = tokio::io::duplex(4);

        stuck
            .outbound()
            .deliver(stuck.id(), &"x".repeat(64))
            .unwrap();

        let session = tokio::spawn(handle_client(
            inbound_rx,
            outbound_tx,
            Arc::clone(&stuck),
            stuck_rx,
            registry.clone(),
            router,
            64,
        ));
        drop(inbound_tx);

        tokio::time::timeout(WRITER_DRAIN_TIMEOUT * 3, session)
            .await
            .expect("session should give up on a stuck writer")
            .unwrap();
        assert!(!registry.contains(stuck.id()).await);

        // Only the first few bytes made it before the writer was aborted.
        let mut received = Vec::new();
        outbound_peer.read_to_end(&mut received).await.unwrap();
        assert!(received.len() < 64);
    }
}
