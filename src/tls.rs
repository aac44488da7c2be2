//! rustls client configuration for the API connection

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use crate::error::{Error, Result};

/// Parse a hex fingerprint string (with or without colons) into 32 bytes.
pub(crate) fn parse_fingerprint(s: &str) -> Result<[u8; 32]> {
    let hex_str: String = s.chars().filter(|c| *c != ':' && !c.is_whitespace()).collect();
    let bytes = hex::decode(&hex_str)
        .map_err(|e| Error::Tls(format!("Invalid SSL fingerprint hex: {}", e)))?;
    let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        Error::Tls(format!(
            "SSL fingerprint must be 32 bytes (SHA-256), got {} bytes",
            bytes.len()
        ))
    })?;
    Ok(arr)
}

/// What the custom verifier checks about the end-entity certificate.
#[derive(Clone, Copy)]
enum CertPolicy {
    /// SHA-256 of the certificate must equal this digest
    Pinned([u8; 32]),
    /// Any certificate is accepted (`reject_unauthorized = false`)
    AcceptAny,
}

/// Replaces chain validation with [`CertPolicy`]. Handshake signatures are
/// still checked with the provider's algorithms.
struct PolicyVerifier {
    policy: CertPolicy,
    provider: Arc<rustls::crypto::CryptoProvider>,
}

impl fmt::Debug for PolicyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PolicyVerifier");
        match self.policy {
            CertPolicy::Pinned(expected) => s.field("pinned", &hex::encode(expected)),
            CertPolicy::AcceptAny => s.field("pinned", &"<any>"),
        };
        s.finish()
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let expected = match self.policy {
            CertPolicy::AcceptAny => return Ok(ServerCertVerified::assertion()),
            CertPolicy::Pinned(expected) => expected,
        };
        let fingerprint = ring::digest::digest(&ring::digest::SHA256, end_entity.as_ref());
        if fingerprint.as_ref() != expected {
            return Err(rustls::Error::General(format!(
                "Certificate fingerprint mismatch: expected {}, got {}",
                hex::encode(expected),
                hex::encode(fingerprint.as_ref())
            )));
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        let algs = &self.provider.signature_verification_algorithms;
        rustls::crypto::verify_tls12_signature(message, cert, dss, algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        let algs = &self.provider.signature_verification_algorithms;
        rustls::crypto::verify_tls13_signature(message, cert, dss, algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Build the rustls config used for https:// API bases.
///
/// Priority: fingerprint pinning, then `reject_unauthorized = false`, then
/// standard verification against the webpki roots.
pub(crate) fn build_tls_config(
    ssl_fingerprint: Option<&str>,
    reject_unauthorized: bool,
) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?;

    let policy = match ssl_fingerprint {
        Some(fp) => Some(CertPolicy::Pinned(parse_fingerprint(fp)?)),
        None if !reject_unauthorized => Some(CertPolicy::AcceptAny),
        None => None,
    };

    let config = match policy {
        Some(policy) => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(PolicyVerifier { policy, provider }))
            .with_no_client_auth(),
        None => {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        }
    };

    Ok(config)
}
