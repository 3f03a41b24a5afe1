//! Server certificate trust state and the trusted-fingerprint store.

use bitflags::bitflags;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use std::collections::HashMap;
use std::fmt::Write as _;

bitflags! {
    /// What was verified about a server certificate.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CertFlags: u8 {
        const AVAILABLE = 1 << 0;
        const DOMAIN_VERIFIED = 1 << 1;
        const TIME_VERIFIED = 1 << 2;
        const AUTHORITY_VERIFIED = 1 << 3;
        const TRUSTED = 1 << 4;
        const HAVE_FINGERPRINT = 1 << 5;
    }
}

/// Certificate expiry as broken-down UTC time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CertExpiry {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Leading banner variant shown above a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    None,
    SiteDomain,
    CertificateWarning,
}

/// Lock icon state for the address bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockIndicator {
    Unavailable,
    DomainMismatch,
    Trusted,
    Untrusted,
}

/// Certificate facts captured from the most recent response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustSnapshot {
    pub flags: CertFlags,
    pub expiry: CertExpiry,
    pub subject: String,
    pub fingerprint: Vec<u8>,
}

const TRUSTABLE: CertFlags = CertFlags::AVAILABLE
    .union(CertFlags::HAVE_FINGERPRINT)
    .union(CertFlags::TIME_VERIFIED)
    .union(CertFlags::DOMAIN_VERIFIED);

const BANNER_REQUIRED: CertFlags = CertFlags::DOMAIN_VERIFIED
    .union(CertFlags::TIME_VERIFIED)
    .union(CertFlags::TRUSTED);

const CHECKED: &str = "\u{2611}";
const UNCHECKED: &str = "\u{2610}";

impl TrustSnapshot {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A certificate can be pinned only when it is otherwise fully valid and
    /// not yet trusted.
    pub fn can_trust(&self) -> bool {
        self.flags == TRUSTABLE
    }

    pub fn have_fingerprint(&self) -> bool {
        self.flags.contains(CertFlags::HAVE_FINGERPRINT)
    }

    pub fn banner_kind(&self) -> BannerKind {
        if self.flags.contains(CertFlags::AVAILABLE) && !self.flags.contains(BANNER_REQUIRED) {
            return BannerKind::CertificateWarning;
        }
        BannerKind::SiteDomain
    }

    pub fn lock_indicator(&self) -> LockIndicator {
        if !self.flags.contains(CertFlags::AVAILABLE) {
            return LockIndicator::Unavailable;
        }
        if !self.flags.contains(CertFlags::DOMAIN_VERIFIED) {
            return LockIndicator::DomainMismatch;
        }
        if self.flags.contains(CertFlags::TRUSTED) {
            return LockIndicator::Trusted;
        }
        LockIndicator::Untrusted
    }

    pub fn fingerprint_hex(&self) -> String {
        let mut out = String::with_capacity(self.fingerprint.len() * 2);
        for byte in &self.fingerprint {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// Four-line certificate summary used by the page information dialog.
    pub fn status_text(&self) -> String {
        let flags = self.flags;
        let mark = |flag: CertFlags| {
            if flags.contains(flag) {
                CHECKED
            } else {
                UNCHECKED
            }
        };
        let mut out = String::from("Certificate Status:\n");
        let _ = writeln!(
            out,
            "{}  {} by CA",
            mark(CertFlags::AUTHORITY_VERIFIED),
            if flags.contains(CertFlags::AUTHORITY_VERIFIED) {
                "Verified"
            } else {
                "Not verified"
            }
        );
        if flags.contains(CertFlags::DOMAIN_VERIFIED) {
            let _ = writeln!(out, "{}  Domain name matches", mark(CertFlags::DOMAIN_VERIFIED));
        } else {
            let _ = writeln!(
                out,
                "{}  Domain name mismatch ({})",
                mark(CertFlags::DOMAIN_VERIFIED),
                self.subject
            );
        }
        let expiry = self.expiry;
        let _ = writeln!(
            out,
            "{}  {} ({:04}-{:02}-{:02} {:02}:{:02}:{:02})",
            mark(CertFlags::TIME_VERIFIED),
            if flags.contains(CertFlags::TIME_VERIFIED) {
                "Not expired"
            } else {
                "Expired"
            },
            expiry.year,
            expiry.month,
            expiry.day,
            expiry.hour,
            expiry.minute,
            expiry.second
        );
        let _ = write!(
            out,
            "{}  {}",
            mark(CertFlags::TRUSTED),
            if flags.contains(CertFlags::TRUSTED) {
                "Trusted"
            } else {
                "Not trusted"
            }
        );
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrustedCert {
    fingerprint: Vec<u8>,
    expiry: CertExpiry,
}

/// Host to pinned fingerprint map.
#[derive(Debug, Default)]
pub struct TrustStore {
    hosts: HashMap<String, TrustedCert>,
}

impl TrustStore {
    pub fn set_trusted(
        &mut self,
        host: &str,
        fingerprint: &[u8],
        expiry: CertExpiry,
    ) -> BrowserResult<()> {
        if host.is_empty() {
            return Err(BrowserError::new(
                "security.trust_host_missing",
                "cannot trust a certificate without a host",
            ));
        }
        if fingerprint.is_empty() {
            return Err(BrowserError::new(
                "security.trust_fingerprint_missing",
                format!("no certificate fingerprint available for `{host}`"),
            ));
        }
        tracing::info!(host, "pinning server certificate");
        self.hosts.insert(
            host.to_ascii_lowercase(),
            TrustedCert {
                fingerprint: fingerprint.to_vec(),
                expiry,
            },
        );
        Ok(())
    }

    pub fn is_trusted(&self, host: &str, fingerprint: &[u8]) -> bool {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .is_some_and(|cert| cert.fingerprint == fingerprint)
    }

    pub fn expiry(&self, host: &str) -> Option<CertExpiry> {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .map(|cert| cert.expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::BannerKind;
    use super::CertFlags;
    use super::LockIndicator;
    use super::TrustSnapshot;
    use super::TrustStore;

    fn snapshot(flags: CertFlags) -> TrustSnapshot {
        TrustSnapshot {
            flags,
            subject: "CN=other.example".to_owned(),
            fingerprint: vec![0xab, 0x01],
            ..TrustSnapshot::default()
        }
    }

    #[test]
    fn trust_requires_exact_flag_set() {
        let valid = CertFlags::AVAILABLE
            .union(CertFlags::HAVE_FINGERPRINT)
            .union(CertFlags::TIME_VERIFIED)
            .union(CertFlags::DOMAIN_VERIFIED);
        assert!(snapshot(valid).can_trust());
        assert!(!snapshot(valid.union(CertFlags::TRUSTED)).can_trust());
        assert!(!snapshot(valid.union(CertFlags::AUTHORITY_VERIFIED)).can_trust());
        assert!(!snapshot(CertFlags::AVAILABLE).can_trust());
    }

    #[test]
    fn banner_warns_until_fully_trusted() {
        assert_eq!(
            snapshot(CertFlags::empty()).banner_kind(),
            BannerKind::SiteDomain
        );
        let verified = CertFlags::AVAILABLE
            .union(CertFlags::DOMAIN_VERIFIED)
            .union(CertFlags::TIME_VERIFIED);
        assert_eq!(
            snapshot(verified).banner_kind(),
            BannerKind::CertificateWarning
        );
        assert_eq!(
            snapshot(verified.union(CertFlags::TRUSTED)).banner_kind(),
            BannerKind::SiteDomain
        );
    }

    #[test]
    fn lock_reflects_domain_and_trust() {
        assert_eq!(
            snapshot(CertFlags::empty()).lock_indicator(),
            LockIndicator::Unavailable
        );
        assert_eq!(
            snapshot(CertFlags::AVAILABLE).lock_indicator(),
            LockIndicator::DomainMismatch
        );
        let trusted = CertFlags::AVAILABLE
            .union(CertFlags::DOMAIN_VERIFIED)
            .union(CertFlags::TRUSTED);
        assert_eq!(snapshot(trusted).lock_indicator(), LockIndicator::Trusted);
    }

    #[test]
    fn status_text_mentions_subject_on_mismatch() {
        let text = snapshot(CertFlags::AVAILABLE).status_text();
        assert!(text.contains("Domain name mismatch (CN=other.example)"));
        assert!(text.contains("Not trusted"));
        assert!(text.contains("0000-00-00 00:00:00"));
    }

    #[test]
    fn fingerprint_hex_is_lowercase() {
        assert_eq!(snapshot(CertFlags::empty()).fingerprint_hex(), "ab01");
    }

    #[test]
    fn store_pins_by_host() {
        let mut store = TrustStore::default();
        let pinned = store.set_trusted("Example.org", &[1, 2, 3], Default::default());
        assert!(pinned.is_ok());
        assert!(store.is_trusted("example.org", &[1, 2, 3]));
        assert!(!store.is_trusted("example.org", &[9]));

        let missing = store.set_trusted("", &[1], Default::default());
        assert!(missing.is_err());
        if let Err(error) = missing {
            assert_eq!(error.code, "security.trust_host_missing");
        }
    }
}
