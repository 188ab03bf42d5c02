//! Certificate lifecycle management for a local Certificate Authority.
//!
//! This crate issues leaf certificates from an existing CA key/certificate
//! pair and renews them later without the SANs being specified again.
//!
//! # Overview
//!
//! - [`identity`] canonicalizes a CN + SAN list and persists it as a SAN
//!   configuration record (`<CN>.san`).
//! - [`store`] maps an identity to `<CN>.key`, `<CN>.csr`, `<CN>.san` and
//!   `<CN>.crt` under the output directory, with staged, atomic promotion.
//! - [`issuance`] drives key generation, CSR generation and CA signing
//!   through a [`CryptoEngine`].
//! - [`renewal`] re-signs every stored CSR using its SAN record.
//! - [`orchestrator`] turns an invocation into one of the two modes.
//!
//! # Example
//!
//! ```no_run
//! use localca_pki::{
//!     CaPassphrase, Configuration, Invocation, Mode, NativeEngine, Orchestrator,
//! };
//!
//! let config = Configuration::new("./certs");
//! let engine = NativeEngine::new();
//! let passphrase = CaPassphrase::default();
//!
//! let mode = Mode::from_invocation(&Invocation {
//!     common_name: Some("example.com".into()),
//!     subject_alternative_names: Some("www.example.com,api.example.com".into()),
//!     renew: false,
//! })
//! .unwrap();
//!
//! let outcome = Orchestrator::new(&config, &engine, &passphrase).run(&mode).unwrap();
//! assert!(outcome.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod issuance;
pub mod orchestrator;
pub mod renewal;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used types at crate root
pub use config::{CaPassphrase, Configuration};
pub use engine::{CryptoEngine, EngineError, NativeEngine, OpensslEngine, SigningRequest, Subject};
pub use error::{Error, IssuanceStep, Result};
pub use identity::{CertificateIdentity, render_san_record};
pub use issuance::{IssuanceMode, IssuanceOutcome, IssuanceState, Issuer};
pub use orchestrator::{Invocation, Mode, Orchestrator, RunOutcome};
pub use renewal::{RenewalEntry, RenewalReport, RenewalScanner, RenewalSummary};
pub use store::{ArtifactKind, ArtifactPaths, ArtifactStore};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, Fixture};

    #[test]
    fn full_workflow_test() {
        let fx = Fixture::new();
        let engine = FakeEngine::default();
        let orchestrator = Orchestrator::new(&fx.config, &engine, &fx.passphrase);

        // 1. Issue with the default SAN list
        let mode = Mode::from_invocation(&Invocation {
            common_name: Some("example.com".into()),
            ..Invocation::default()
        })
        .unwrap();
        let RunOutcome::Issued(first) = orchestrator.run(&mode).unwrap() else {
            panic!("expected issuance");
        };

        // 2. Issue with explicit SANs
        let mode = Mode::from_invocation(&Invocation {
            common_name: Some("api.test".into()),
            subject_alternative_names: Some("www.api.test,v2.api.test".into()),
            renew: false,
        })
        .unwrap();
        let RunOutcome::Issued(second) = orchestrator.run(&mode).unwrap() else {
            panic!("expected issuance");
        };
        let record = std::fs::read_to_string(&second.paths.san_path).unwrap();
        assert!(record.contains("DNS.1 = www.api.test\nDNS.2 = v2.api.test\n"));
        assert!(!record.contains("DNS.3"));

        // 3. Renew everything
        let key_before = std::fs::read(&first.paths.key_path).unwrap();
        let RunOutcome::Renewed(report) = orchestrator.run(&Mode::Renew).unwrap() else {
            panic!("expected renewal");
        };
        assert_eq!(report.renewed_count(), 2);
        assert_eq!(std::fs::read(&first.paths.key_path).unwrap(), key_before);

        // 4. The default SAN list survived renewal
        let restored = CertificateIdentity::reconstruct_from_san_record(&first.paths.san_path).unwrap();
        assert_eq!(restored.sans(), ["example.com"]);
    }
}
