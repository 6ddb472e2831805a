//! HTTP client helper with native-tls support.
//!
//! All outbound requests (diagram rendering, the remote documents API) go
//! through one agent configuration so timeouts and TLS behavior stay
//! consistent. native-tls is used over rustls because it defers to the
//! platform's TLS stack and root store.

use std::time::Duration;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::Agent;

/// Global timeout for all HTTP operations (30 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum response body size for API responses (10 MB).
pub const MAX_API_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum response body size for rendered diagram images (20 MB).
pub const MAX_IMAGE_SIZE: u64 = 20 * 1024 * 1024;

/// Create a new HTTP agent configured with native-tls and a global timeout.
pub fn agent() -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into()
}
