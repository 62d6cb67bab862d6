//! TLS для клиентских соединений (rustls).
//!
//! Поддерживаются три режима: проверка сервера по CA-бандлу (или по
//! корневым сертификатам Mozilla), клиентская аутентификация парой
//! сертификат/ключ и явно разрешённый режим без проверки сертификата.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use kvdump_error::TlsError;
use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider},
    pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime},
    ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Материал TLS, заданный пользователем.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM-бандл доверенных CA
    pub ca_cert: Option<PathBuf>,
    /// Клиентский сертификат (PEM)
    pub cert: Option<PathBuf>,
    /// Приватный ключ клиентского сертификата (PEM)
    pub key: Option<PathBuf>,
    /// Не проверять сертификат сервера
    pub insecure: bool,
}

impl TlsOptions {
    /// Проверяет согласованность материала: пара сертификат/ключ задаётся
    /// целиком, а при отсутствии CA и сертификата нужен `insecure`.
    pub fn validate(&self) -> Result<(), TlsError> {
        if self.cert.is_some() != self.key.is_some() {
            return Err(TlsError::IncompleteKeyPair);
        }
        if self.ca_cert.is_none() && self.cert.is_none() && !self.insecure {
            return Err(TlsError::NoCertificates);
        }
        Ok(())
    }

    /// Собирает `TlsConnector` (один на фабрику соединений).
    pub fn build_connector(&self) -> Result<TlsConnector, TlsError> {
        self.validate()?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config(e.to_string()))?;

        let builder = if self.insecure {
            warn!("TLS certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipVerification(provider)))
        } else {
            let mut roots = RootCertStore::empty();
            match &self.ca_cert {
                Some(path) => {
                    for cert in load_certs(path)? {
                        roots.add(cert).map_err(|e| {
                            TlsError::Certificate(format!("{}: {e}", path.display()))
                        })?;
                    }
                    debug!(ca = %path.display(), roots = roots.len(), "Loaded CA bundle");
                }
                None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
            }
            builder.with_root_certificates(roots)
        };

        let config = match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => builder
                .with_client_auth_cert(load_certs(cert)?, load_key(key)?)
                .map_err(|e| TlsError::Config(e.to_string()))?,
            _ => builder.with_no_client_auth(),
        };

        Ok(TlsConnector::from(Arc::new(config)))
    }
}

/// Имя сервера для SNI и проверки сертификата.
pub fn server_name(host: &str) -> Result<ServerName<'static>, TlsError> {
    ServerName::try_from(host.to_string()).map_err(|_| TlsError::ServerName(host.to_string()))
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Certificate(format!("{}: {e}", path.display())))?;

    if certs.is_empty() {
        return Err(TlsError::Certificate(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::PrivateKey(format!("{}: {e}", path.display())))?
        .ok_or_else(|| TlsError::PrivateKey(format!("no private key found in {}", path.display())))
}

/// Верификатор, принимающий любой сертификат сервера. Подписи рукопожатия
/// всё равно проверяются алгоритмами провайдера.
#[derive(Debug)]
struct SkipVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
