//! Render daemon core logic.
//!
//! Opens the configured display once and serves it through a
//! `RemoteProxy` until a shutdown signal arrives or the listener fails.

use std::future::Future;
use std::net::SocketAddr;

use tracing::{error, info};
use usbscreen_core::{RemoteProxy, ScreenError};

use crate::config::RenderConfig;

// ── RenderService ────────────────────────────────────────────────

/// The top-level render service.
pub struct RenderService {
    config: RenderConfig,
    proxy: RemoteProxy,
    addr: SocketAddr,
}

impl RenderService {
    /// Open the display and start listening.
    pub async fn start(config: RenderConfig) -> Result<Self, ScreenError> {
        let device = usbscreen_core::connect(&config.device).await?;
        let mut proxy = RemoteProxy::new(device, config.network.listen.clone());
        let addr = proxy.start().await?;
        info!(%addr, target = %config.device.target, "render service started");

        Ok(Self {
            config,
            proxy,
            addr,
        })
    }

    /// The address clients connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` resolves, then drain and stop.
    ///
    /// A listener failure ends the service with that error.
    pub async fn serve_until<F>(mut self, shutdown: F) -> Result<(), ScreenError>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            _ = shutdown => {
                info!("shutdown requested");
                Ok(())
            }
            closed = self.proxy.closed() => {
                if let Err(e) = &closed {
                    error!("listener failed: {e}");
                }
                closed
            }
        };

        let stopped = self
            .proxy
            .stop(self.config.network.shutdown_timeout())
            .await;
        outcome?;
        stopped
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;
    use usbscreen_core::{ControlDevice, DeviceConfig, RemoteClient};

    fn mock_config() -> RenderConfig {
        let mut cfg = RenderConfig::default();
        cfg.network.listen = "127.0.0.1:0".into();
        cfg.device = DeviceConfig {
            target: "mock".into(),
            ..DeviceConfig::default()
        };
        cfg
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let service = RenderService::start(mock_config()).await.unwrap();
        let addr = service.local_addr().to_string();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn(service.serve_until(async {
            stop_rx.await.ok();
        }));

        let mut client = RemoteClient::connect(&addr, Duration::from_secs(5))
            .await
            .unwrap();
        assert_ok!(client.startup().await);
        assert_ok!(client.set_light(50).await);

        stop_tx.send(()).unwrap();
        assert_ok!(running.await.unwrap());
    }

    #[tokio::test]
    async fn missing_display_fails_start() {
        let mut cfg = mock_config();
        cfg.device.target = "no-such-display-port-xyz".into();
        assert!(RenderService::start(cfg).await.is_err());
    }
}
