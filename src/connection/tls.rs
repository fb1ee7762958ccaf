//! TLS configuration for connections to Postgres.
//!
//! `SslMode` mirrors the libpq `sslmode` parameter. `TlsConfig` compiles a mode
//! into a rustls `ClientConfig`; the certificate checks it performs depend on
//! the mode:
//!
//! * `require`: TLS is negotiated but the server certificate is accepted as-is
//! * `verify-ca`: the chain must lead to a trusted root, the hostname is not checked
//! * `verify-full`: chain and hostname are both checked

use crate::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_postgres_rustls::MakeRustlsConnect;

/// SSL/TLS connection mode matching PostgreSQL `sslmode` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No TLS (plaintext connection)
    Disable,
    /// TLS required, but server certificate is not verified
    Require,
    /// TLS required, server certificate must be signed by a trusted CA
    VerifyCa,
    /// TLS required, server certificate must be signed by a trusted CA and hostname must match
    #[default]
    VerifyFull,
}

impl SslMode {
    /// Whether this mode negotiates TLS at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disable)
    }

    /// Whether this mode requires certificate verification (CA or full)
    pub fn requires_verification(&self) -> bool {
        matches!(self, Self::VerifyCa | Self::VerifyFull)
    }

    /// The mode handed to `tokio-postgres`, which only distinguishes whether TLS is
    /// attempted. Certificate checks are done by our own rustls verifier.
    pub(crate) fn to_pg(self) -> tokio_postgres::config::SslMode {
        match self {
            Self::Disable => tokio_postgres::config::SslMode::Disable,
            Self::Require | Self::VerifyCa | Self::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Require => write!(f, "require"),
            Self::VerifyCa => write!(f, "verify-ca"),
            Self::VerifyFull => write!(f, "verify-full"),
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disable" => Ok(Self::Disable),
            "require" => Ok(Self::Require),
            "verify-ca" => Ok(Self::VerifyCa),
            "verify-full" => Ok(Self::VerifyFull),
            _ => Err(Error::Config(format!(
                "invalid sslmode '{}': expected disable, require, verify-ca, or verify-full",
                s
            ))),
        }
    }
}

/// TLS settings carried by a `ConnectionConfig`.
///
/// The default verifies the full certificate chain and hostname. Skipping
/// verification has to be asked for explicitly with [`TlsOptions::require_unverified`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Negotiation and verification mode
    pub mode: SslMode,
    /// PEM file with trusted CA certificates (None = system roots)
    pub ca_cert_path: Option<PathBuf>,
}

impl TlsOptions {
    /// TLS with the given mode and system roots
    pub fn new(mode: SslMode) -> Self {
        Self {
            mode,
            ca_cert_path: None,
        }
    }

    /// Plaintext connections
    pub fn disabled() -> Self {
        Self::new(SslMode::Disable)
    }

    /// TLS is mandatory but any server certificate is accepted (self-signed, expired, ...)
    pub fn require_unverified() -> Self {
        Self::new(SslMode::Require)
    }

    /// Trust the CA certificates in `path` instead of the system roots
    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Whether TLS is negotiated
    pub fn enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    /// Whether the server certificate is validated
    pub fn verifies_certificates(&self) -> bool {
        self.mode.requires_verification()
    }

    /// Compile into a [`TlsConfig`]. Returns `None` for `disable`.
    pub fn to_tls_config(&self) -> Result<Option<TlsConfig>> {
        if !self.mode.is_enabled() {
            return Ok(None);
        }

        let mut builder = TlsConfig::builder().verify_hostname(self.mode == SslMode::VerifyFull);

        if let Some(ref ca_path) = self.ca_cert_path {
            builder = builder.ca_cert_path(ca_path);
        }

        if self.mode == SslMode::Require {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map(Some)
    }
}

/// Compiled TLS configuration.
///
/// # Examples
///
/// ```ignore
/// use pg_bootstrap::connection::TlsConfig;
///
/// // With system root certificates (production)
/// let tls = TlsConfig::builder()
///     .verify_hostname(true)
///     .build()?;
///
/// // For development (danger: disables verification)
/// let tls = TlsConfig::builder()
///     .danger_accept_invalid_certs(true)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    ca_cert_path: Option<PathBuf>,
    verify_hostname: bool,
    danger_accept_invalid_certs: bool,
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Create a new TLS configuration builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Check if hostname verification is enabled.
    pub fn verify_hostname(&self) -> bool {
        self.verify_hostname && !self.danger_accept_invalid_certs
    }

    /// Check if invalid certificates are accepted (development only).
    pub fn danger_accept_invalid_certs(&self) -> bool {
        self.danger_accept_invalid_certs
    }

    /// TLS connector for `tokio-postgres` using this configuration
    pub fn make_tls_connect(&self) -> MakeRustlsConnect {
        MakeRustlsConnect::new((*self.client_config).clone())
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("verify_hostname", &self.verify_hostname)
            .field(
                "danger_accept_invalid_certs",
                &self.danger_accept_invalid_certs,
            )
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS configuration.
pub struct TlsConfigBuilder {
    ca_cert_path: Option<PathBuf>,
    verify_hostname: bool,
    danger_accept_invalid_certs: bool,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            ca_cert_path: None,
            verify_hostname: true,
            danger_accept_invalid_certs: false,
        }
    }
}

impl TlsConfigBuilder {
    /// Set the path to a custom CA certificate file (PEM format).
    ///
    /// If not set, system root certificates will be used.
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Enable or disable hostname verification (default: enabled).
    pub fn verify_hostname(mut self, verify: bool) -> Self {
        self.verify_hostname = verify;
        self
    }

    /// ⚠️ **DANGER**: Accept invalid certificates.
    ///
    /// Disables certificate validation entirely, making the connection
    /// vulnerable to man-in-the-middle attacks. Traffic is still encrypted.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - CA certificate file cannot be read
    /// - CA certificate file contains no certificates
    /// - no usable crypto provider is available
    pub fn build(self) -> Result<TlsConfig> {
        let provider = crypto_provider();

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let client_config = if self.danger_accept_invalid_certs {
            tracing::warn!("TLS certificate validation is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
                .with_no_client_auth()
        } else {
            let roots = match &self.ca_cert_path {
                Some(path) => load_custom_ca(path)?,
                None => load_system_roots(),
            };

            if self.verify_hostname {
                builder.with_root_certificates(roots).with_no_client_auth()
            } else {
                let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
                    .build()
                    .map_err(|e| Error::Tls(format!("failed to build certificate verifier: {}", e)))?;
                builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(SkipHostnameVerification { inner }))
                    .with_no_client_auth()
            }
        };

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            verify_hostname: self.verify_hostname,
            danger_accept_invalid_certs: self.danger_accept_invalid_certs,
            client_config: Arc::new(client_config),
        })
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// System roots via rustls-native-certs, falling back to the bundled Mozilla roots.
fn load_system_roots() -> RootCertStore {
    let result = rustls_native_certs::load_native_certs();

    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if added == 0 {
        tracing::debug!(
            errors = result.errors.len(),
            "no native root certificates loaded, using webpki roots"
        );
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    store
}

/// Load a custom CA certificate from a PEM file.
fn load_custom_ca(ca_path: &Path) -> Result<RootCertStore> {
    let file = File::open(ca_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read CA certificate file '{}': {}",
            ca_path.display(),
            e
        ))
    })?;

    let mut reader = BufReader::new(file);
    let mut root_store = RootCertStore::empty();
    let mut found_certs = 0;

    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|_| {
            Error::Config(format!(
                "Failed to parse CA certificate from '{}'",
                ca_path.display()
            ))
        })?;
        root_store.add(cert).map_err(|e| {
            Error::Config(format!(
                "Invalid CA certificate in '{}': {}",
                ca_path.display(),
                e
            ))
        })?;
        found_certs += 1;
    }

    if found_certs == 0 {
        return Err(Error::Config(format!(
            "No valid certificates found in '{}'",
            ca_path.display()
        )));
    }

    Ok(root_store)
}

/// Accepts any server certificate. Handshake signatures are still checked so the
/// peer must hold the key for the certificate it presents.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Full chain verification with the name check dropped (`verify-ca`).
#[derive(Debug)]
struct SkipHostnameVerification {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for SkipHostnameVerification {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForName)) => {
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_config_builder_defaults() {
        let tls = TlsConfigBuilder::default();
        assert!(!tls.danger_accept_invalid_certs);
        assert!(tls.verify_hostname);
        assert!(tls.ca_cert_path.is_none());
    }

    #[test]
    fn test_tls_config_accept_invalid_certs() {
        let tls = TlsConfig::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Failed to build TLS config");

        assert!(tls.danger_accept_invalid_certs());
        assert!(!tls.verify_hostname());
    }

    #[test]
    fn test_tls_config_with_hostname_verification() {
        let tls = TlsConfig::builder()
            .verify_hostname(true)
            .build()
            .expect("Failed to build TLS config");

        assert!(tls.verify_hostname());
        assert!(!tls.danger_accept_invalid_certs());
    }

    #[test]
    fn test_tls_config_missing_ca_file() {
        let result = TlsConfig::builder()
            .ca_cert_path("/nonexistent/pg-bootstrap/ca.pem")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_tls_config_ca_file_without_certs() {
        let path = std::env::temp_dir().join(format!("pg-bootstrap-empty-{}.pem", std::process::id()));
        std::fs::write(&path, "not a certificate\n").unwrap();

        let result = TlsConfig::builder().ca_cert_path(&path).build();
        let _ = std::fs::remove_file(&path);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("No valid certificates"));
    }

    #[test]
    fn test_ssl_mode_from_str() {
        assert_eq!("disable".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
        assert_eq!("verify-ca".parse::<SslMode>().unwrap(), SslMode::VerifyCa);
        assert_eq!(
            "verify-full".parse::<SslMode>().unwrap(),
            SslMode::VerifyFull
        );
    }

    #[test]
    fn test_ssl_mode_from_str_invalid() {
        assert!("invalid".parse::<SslMode>().is_err());
        assert!("prefer".parse::<SslMode>().is_err());
    }

    #[test]
    fn test_ssl_mode_display() {
        assert_eq!(SslMode::Disable.to_string(), "disable");
        assert_eq!(SslMode::Require.to_string(), "require");
        assert_eq!(SslMode::VerifyCa.to_string(), "verify-ca");
        assert_eq!(SslMode::VerifyFull.to_string(), "verify-full");
    }

    #[test]
    fn test_ssl_mode_default_verifies() {
        assert_eq!(SslMode::default(), SslMode::VerifyFull);
        assert!(TlsOptions::default().verifies_certificates());
    }

    #[test]
    fn test_ssl_mode_serde() {
        let json = serde_json::to_string(&SslMode::VerifyCa).unwrap();
        assert_eq!(json, "\"verify-ca\"");
        let mode: SslMode = serde_json::from_str("\"require\"").unwrap();
        assert_eq!(mode, SslMode::Require);
    }

    #[test]
    fn test_ssl_mode_requires_verification() {
        assert!(!SslMode::Disable.requires_verification());
        assert!(!SslMode::Require.requires_verification());
        assert!(SslMode::VerifyCa.requires_verification());
        assert!(SslMode::VerifyFull.requires_verification());
    }

    #[test]
    fn test_tls_options_require_unverified() {
        let opts = TlsOptions::require_unverified();
        assert!(opts.enabled());
        assert!(!opts.verifies_certificates());

        let tls = opts.to_tls_config().unwrap().expect("TLS config");
        assert!(tls.danger_accept_invalid_certs());
    }

    #[test]
    fn test_tls_options_disabled_returns_none() {
        let opts = TlsOptions::disabled();
        assert!(!opts.enabled());
        assert!(opts.to_tls_config().unwrap().is_none());
    }

    #[test]
    fn test_tls_options_verify_ca_skips_hostname() {
        let tls = TlsOptions::new(SslMode::VerifyCa)
            .to_tls_config()
            .unwrap()
            .expect("TLS config");
        assert!(!tls.verify_hostname());
        assert!(!tls.danger_accept_invalid_certs());
    }

    #[test]
    fn test_make_tls_connect_accepts_hostnames_and_ips() {
        use tokio_postgres::tls::MakeTlsConnect;

        let tls = TlsOptions::require_unverified()
            .to_tls_config()
            .unwrap()
            .expect("TLS config");

        let mut connector = tls.make_tls_connect();
        for host in ["db.example.com", "localhost", "127.0.0.1"] {
            let result =
                MakeTlsConnect::<tokio::net::TcpStream>::make_tls_connect(&mut connector, host);
            assert!(result.is_ok(), "host {:?}", host);
        }
    }

    #[test]
    fn test_tls_config_debug() {
        let tls = TlsConfig::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Failed to build TLS config");

        let debug_str = format!("{:?}", tls);
        assert!(debug_str.contains("TlsConfig"));
        assert!(debug_str.contains("danger_accept_invalid_certs: true"));
    }
}
