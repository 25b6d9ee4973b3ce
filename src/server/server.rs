//! Content server assembly and startup

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use super::config::ServerConfig;
use super::routes::{content_routes, ContentState};

/// The read-only content-serving facade.
pub struct ContentServer {
    config: ServerConfig,
    router: Router,
}

impl ContentServer {
    /// Builds a server with default configuration.
    pub fn new(state: Arc<ContentState>) -> Self {
        Self::with_config(ServerConfig::default(), state)
    }

    pub fn with_config(config: ServerConfig, state: Arc<ContentState>) -> Self {
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    fn build_router(config: &ServerConfig, state: Arc<ContentState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new().allow_origin(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        };

        content_routes(state).layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Consumes the server and returns its router (for tests).
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds and serves until the process exits.
    pub async fn start(self) -> io::Result<()> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid listen address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        println!("Serving patched archive on http://{}", addr);
        println!("GET /<key> returns resolved content; the store is read-only here.");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::LayeredReader;
    use crate::patch::PatchStore;
    use crate::store::KvStore;
    use tempfile::TempDir;

    fn test_state(temp: &TempDir) -> Arc<ContentState> {
        let base_dir = temp.path().join("base");
        {
            let mut base = KvStore::open(&base_dir).unwrap();
            base.put(b"/a".to_vec(), b"base copy".to_vec()).unwrap();
        }
        let patch_dir = temp.path().join("patch");
        {
            let _ = PatchStore::open(&patch_dir).unwrap();
        }
        let reader = LayeredReader::open(&patch_dir, &base_dir).unwrap();
        Arc::new(ContentState::new(reader))
    }

    #[test]
    fn test_server_uses_config_address() {
        let temp = TempDir::new().unwrap();
        let server = ContentServer::with_config(ServerConfig::with_port(8080), test_state(&temp));
        assert_eq!(server.socket_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_router_builds() {
        let temp = TempDir::new().unwrap();
        let server = ContentServer::new(test_state(&temp));
        let _router = server.router();
    }
}
