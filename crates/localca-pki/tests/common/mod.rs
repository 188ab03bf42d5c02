//! Test helpers for native engine tests.

#![allow(dead_code)]

use std::path::Path;

use localca_pki::Configuration;
use pkcs8::{LineEnding, PrivateKeyInfo};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose};
use tempfile::TempDir;

/// Subject CN of the scratch CA.
pub const CA_NAME: &str = "localca Test CA";

/// A throwaway CA plus an output directory.
pub struct TestCa {
    pub dir: TempDir,
    pub config: Configuration,
}

impl TestCa {
    /// Creates a CA whose key is optionally encrypted with `passphrase`.
    pub fn new(passphrase: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let key = KeyPair::generate().unwrap();

        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, CA_NAME);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let cert = params.self_signed(&key).unwrap();

        let mut config = Configuration::new(dir.path().join("certs"));
        config.ca_key = dir.path().join("ca.key");
        config.ca_cert = dir.path().join("ca.crt");
        config.validity_days = 30;

        std::fs::write(&config.ca_cert, cert.pem()).unwrap();
        std::fs::write(&config.ca_key, key_pem(&key, passphrase)).unwrap();

        Self { dir, config }
    }

    /// Replaces the CA key with an unrelated one.
    pub fn swap_key(&self) {
        let other = KeyPair::generate().unwrap();
        std::fs::write(&self.config.ca_key, other.serialize_pem()).unwrap();
    }
}

fn key_pem(key: &KeyPair, passphrase: Option<&str>) -> String {
    let Some(passphrase) = passphrase else {
        return key.serialize_pem();
    };
    let der = key.serialize_der();
    let info = PrivateKeyInfo::try_from(der.as_slice()).unwrap();
    let encrypted = info.encrypt(rand::rngs::OsRng, passphrase).unwrap();
    encrypted
        .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
        .unwrap()
        .to_string()
}

/// DNS names in the certificate's SAN extension, in order.
pub fn certificate_dns_names(path: &Path) -> Vec<String> {
    use x509_parser::extensions::GeneralName;

    let pem_bytes = std::fs::read(path).unwrap();
    let (_, pem) = x509_parser::pem::parse_x509_pem(&pem_bytes).unwrap();
    let cert = pem.parse_x509().unwrap();
    let san = cert.subject_alternative_name().unwrap().unwrap();

    san.value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_string()),
            _ => None,
        })
        .collect()
}

/// Subject CN, issuer CN and serial of a certificate.
pub fn certificate_summary(path: &Path) -> (String, String, Vec<u8>) {
    let pem_bytes = std::fs::read(path).unwrap();
    let (_, pem) = x509_parser::pem::parse_x509_pem(&pem_bytes).unwrap();
    let cert = pem.parse_x509().unwrap();

    let cn = |name: &x509_parser::x509::X509Name<'_>| {
        name.iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    (
        cn(cert.subject()),
        cn(cert.issuer()),
        cert.raw_serial().to_vec(),
    )
}
