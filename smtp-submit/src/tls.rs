use std::sync::{Arc, OnceLock};

use tokio_rustls::rustls::{self, ClientConfig};

static CLIENT_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

fn native_roots() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }
    roots
}

/// The process-wide, lazily-built TLS client configuration used for
/// both implicit TLS and `STARTTLS` upgrades. Built once and shared; a
/// `rustls::ClientConfig` is safe for concurrent use.
#[must_use]
pub fn client_config() -> Arc<ClientConfig> {
    CLIENT_CONFIG
        .get_or_init(|| {
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(native_roots())
                    .with_no_client_auth(),
            )
        })
        .clone()
}
