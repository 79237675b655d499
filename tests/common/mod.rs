//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use api_gateway::config::{GatewayConfig, ModuleConfig, RouteConfig};
use api_gateway::lifecycle::Shutdown;
use api_gateway::{ExtensionRegistry, Gateway};

/// Start a programmable mock backend. The handler receives the request
/// method and path (with query) and returns (status, body).
pub async fn start_backend<F, Fut>(addr: SocketAddr, handler: F)
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        // Read the request head; body bytes past the head
                        // are irrelevant to these tests.
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let head = String::from_utf8_lossy(&buf);
                        let mut first_line = head.lines().next().unwrap_or("").split(' ');
                        let method = first_line.next().unwrap_or("").to_string();
                        let path = first_line.next().unwrap_or("").to_string();

                        let (status, body) = handler(method, path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a gateway on `addr`. The returned coordinator must stay alive for
/// the duration of the test; dropping it stops the server.
#[allow(dead_code)]
pub async fn start_gateway(
    addr: SocketAddr,
    config: GatewayConfig,
    registry: ExtensionRegistry,
) -> Shutdown {
    registry.init_all().await.unwrap();
    let gateway = Gateway::new(config, &registry).expect("route compilation failed");
    let listener = TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = gateway.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// A minimal route definition.
#[allow(dead_code)]
pub fn route(method: &str, upstream: &str, downstream: &str) -> RouteConfig {
    RouteConfig {
        upstream: upstream.to_string(),
        method: method.to_string(),
        downstream: downstream.to_string(),
        downstream_method: None,
        claims: Vec::new(),
        schema: None,
        extensions: Vec::new(),
        retries: None,
        body: None,
        forward_headers: None,
    }
}

/// A single-module config serving on `bind`.
#[allow(dead_code)]
pub fn config_for(bind: SocketAddr, routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = bind.to_string();
    config.modules.push(ModuleConfig {
        name: "test".to_string(),
        path: String::new(),
        routes,
        retries: None,
    });
    config
}

/// A reqwest client that neither pools nor proxies, for test isolation.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
