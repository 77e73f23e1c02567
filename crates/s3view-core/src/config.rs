// ── Runtime catalog configuration ──
//
// Describes *how* to reach the backend and how the engine paces its work.
// Never touches disk: the CLI (via s3view-config) builds a `CatalogConfig`
// and hands it in.

use std::time::Duration;

use s3view_api::ReconnectConfig;
use url::Url;

/// Quiet period the debounce coalescer waits before refetching a detail.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed deployments).
    DangerAcceptInvalid,
}

/// Configuration for one catalog backend.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Deployment root, including any base path
    /// (e.g., `https://images.example.com/viewer/`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Debounce quiet period for detail refetches.
    pub debounce: Duration,
    /// Subscribe to the notification WebSocket on connect.
    pub websocket_enabled: bool,
    /// Notification stream reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl CatalogConfig {
    /// Config for `url` with default pacing.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            debounce: DEFAULT_DEBOUNCE,
            websocket_enabled: true,
            reconnect: ReconnectConfig::default(),
        }
    }

    pub(crate) fn transport(&self) -> s3view_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => s3view_api::TlsMode::System,
            TlsVerification::CustomCa(path) => s3view_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => s3view_api::TlsMode::DangerAcceptInvalid,
        };
        s3view_api::TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
