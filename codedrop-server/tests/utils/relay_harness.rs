use anyhow::{Context, Result};
use codedrop_server::{RelayConfig, SignalingService, serve};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::signal_helpers::TEST_SESSION_MAX_AGE;

/// A relay served on an ephemeral loopback port.
pub struct RelayHandle {
    pub addr: SocketAddr,
    pub service: SignalingService,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl RelayHandle {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.context("relay task panicked")?
    }
}

pub async fn spawn_relay() -> Result<RelayHandle> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind loopback")?;
    let addr = listener.local_addr()?;

    let config = RelayConfig {
        bind: addr,
        session_max_age: TEST_SESSION_MAX_AGE,
        sweep_interval: Duration::from_secs(1),
        ice_servers: Vec::new(),
    };
    let service = SignalingService::new(config.session_max_age, config.ice_servers.clone());

    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(listener, service.clone(), config, async move {
        let _ = rx.await;
    }));

    Ok(RelayHandle {
        addr,
        service,
        shutdown: Some(tx),
        task,
    })
}
