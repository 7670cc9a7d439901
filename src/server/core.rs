use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};

use crate::client::{Client, ClientRegistry, Outbound, SessionId, handle_client};
use crate::error::handlers::log_error;
use crate::error::{ListenerError, RegistryError, RelayError};
use crate::router::Router;
use crate::server::config::RelayConfig;

/// Accepts participants and runs one session task per connection.
pub struct Server {
    listener: TcpListener,
    registry: ClientRegistry,
    router: Router,
    config: Arc<RelayConfig>,
    next_session: AtomicU64,
}

impl Server {
    /// Binds the configured address. Failing to bind is fatal.
    pub async fn bind(config: RelayConfig) -> Result<Self, ListenerError> {
        let socket = config.listen_socket();

        let listener = TcpListener::bind(&socket)
            .await
            .map_err(|e| ListenerError::Bind(socket.clone(), e))?;
        info!("Server bound to {}", socket);

        let registry = ClientRegistry::new(config.max_clients);
        let router = Router::new(registry.clone());

        Ok(Self {
            listener,
            registry,
            router,
            config: Arc::new(config),
            next_session: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Accepts connections forever. Individual accept failures are logged and skipped.
    pub async fn start(&self) {
        info!(
            "Starting chat relay on {} (max {} clients)",
            self.local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| self.config.listen_socket()),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.register_connection(stream, addr).await,
                Err(e) => log_error(&RelayError::from(ListenerError::Accept(e))),
            }
        }
    }

    /// Registers a bare client for a freshly accepted connection and spawns its session.
    async fn register_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let id = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
        let (outbound, outbound_rx) = Outbound::channel(self.config.outbound_capacity);
        let client = Arc::new(Client::new(id, addr, outbound));

        match self.registry.add(Arc::clone(&client)).await {
            Ok(()) => {
                info!("Accepted {} as session {}", addr, id);
            }
            Err(e @ RegistryError::Full(_)) => {
                // Dropping the stream closes the connection.
                warn!("Rejecting {}: {}", addr, e);
                return;
            }
            Err(e) => {
                error!("Rejecting {}: {}", addr, e);
                return;
            }
        }

        let registry = self.registry.clone();
        let router = self.router.clone();
        let max_frame_length = self.config.max_frame_length;

        // Spawn a task for each client so the accept loop doesn't block
        tokio::spawn(async move {
            let (read_half, write_half) = stream.into_split();
            handle_client(
                read_half,
                write_half,
                client,
                outbound_rx,
                registry,
                router,
                max_frame_length,
            )
            .await;
        });
    }
}
