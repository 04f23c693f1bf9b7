//! Certificate view and validity classification.
//!
//! [`CertInfo`] is the read-only slice of an X.509 certificate this tool looks
//! at: subject organizations, subject common name and the validity bounds.
//! [`classify`] splits a chain into certificates that are inside their
//! validity window and certificates that are not.

use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::nid::Nid;
use openssl::x509::{X509NameEntryRef, X509Ref};
use serde::Serialize;

use crate::error::ProbeError;

/// Timestamp layout used when reporting validity bounds.
pub const YMD_HMS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Subject organizations, in the order they appear in the subject name
    pub organizations: Vec<String>,
    pub common_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl CertInfo {
    /// Builds the view from a parsed certificate.
    ///
    /// Missing subject entries become empty values. Fails only when a
    /// validity bound cannot be converted to a UTC timestamp.
    pub fn from_x509(cert: &X509Ref) -> Result<CertInfo, ProbeError> {
        let subject = cert.subject_name();
        let organizations = subject
            .entries_by_nid(Nid::ORGANIZATIONNAME)
            .map(entry_to_string)
            .collect();
        let common_name = subject
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .map(entry_to_string)
            .unwrap_or_default();

        Ok(CertInfo {
            organizations,
            common_name,
            not_before: asn1_to_utc(cert.not_before())?,
            not_after: asn1_to_utc(cert.not_after())?,
        })
    }

    /// `O=<org>, ..., CN=<common name>`, or just `CN=<common name>` when the
    /// subject carries no organization.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .organizations
            .iter()
            .map(|o| format!("O={}", o))
            .collect();
        parts.push(format!("CN={}", self.common_name));
        parts.join(", ")
    }

    /// Both bounds are exclusive: a certificate is not valid at the exact
    /// instant of `not_before` nor at the exact instant of `not_after`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_before && now < self.not_after
    }

    pub fn not_before_display(&self) -> String {
        self.not_before.format(YMD_HMS_FORMAT).to_string()
    }

    pub fn not_after_display(&self) -> String {
        self.not_after.format(YMD_HMS_FORMAT).to_string()
    }
}

/// A chain split by validity. Both halves keep the input order.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub expired: Vec<CertInfo>,
    pub unexpired: Vec<CertInfo>,
}

impl Classification {
    /// True when at least one certificate of the chain is outside its
    /// validity window, even if the others are fine.
    pub fn any_expired(&self) -> bool {
        !self.expired.is_empty()
    }
}

/// Splits `certs` into expired (or not yet valid) and currently valid ones.
pub fn classify(certs: Vec<CertInfo>, now: DateTime<Utc>) -> Classification {
    let mut classification = Classification::default();
    for cert in certs {
        if cert.is_valid_at(now) {
            classification.unexpired.push(cert);
        } else {
            classification.expired.push(cert);
        }
    }
    classification
}

// Subject strings are read from their raw bytes so an embedded NUL does not
// cut the value short.
fn entry_to_string(entry: &X509NameEntryRef) -> String {
    String::from_utf8_lossy(entry.data().as_slice()).into_owned()
}

fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, ProbeError> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let secs = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| ProbeError::CertificateError {
        reason: format!("validity bound out of range: {}", time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cert(orgs: &[&str], cn: &str, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> CertInfo {
        CertInfo {
            organizations: orgs.iter().map(|o| o.to_string()).collect(),
            common_name: cn.to_string(),
            not_before,
            not_after,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_summary_with_organizations() {
        let c = cert(&["Acme", "Acme Labs"], "acme.test", now(), now());
        assert_eq!(c.summary(), "O=Acme, O=Acme Labs, CN=acme.test");
    }

    #[test]
    fn test_summary_without_organizations() {
        let c = cert(&[], "bare.test", now(), now());
        assert_eq!(c.summary(), "CN=bare.test");
    }

    #[test]
    fn test_summary_with_empty_common_name() {
        let c = cert(&["Acme"], "", now(), now());
        assert_eq!(c.summary(), "O=Acme, CN=");
    }

    #[test]
    fn test_valid_inside_window() {
        let c = cert(&[], "a", now() - Duration::days(1), now() + Duration::days(1));
        assert!(c.is_valid_at(now()));
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let c = cert(&[], "a", now(), now() + Duration::days(1));
        assert!(!c.is_valid_at(now()));

        let c = cert(&[], "a", now() - Duration::days(1), now());
        assert!(!c.is_valid_at(now()));
    }

    #[test]
    fn test_lower_bound_one_nanosecond() {
        let not_before = now();
        let c = cert(&[], "a", not_before, not_before + Duration::days(30));
        assert!(c.is_valid_at(not_before + Duration::nanoseconds(1)));
        assert!(!c.is_valid_at(not_before - Duration::nanoseconds(1)));
    }

    #[test]
    fn test_not_yet_valid_is_expired() {
        let c = cert(&[], "future", now() + Duration::days(1), now() + Duration::days(2));
        let result = classify(vec![c.clone()], now());
        assert!(result.any_expired());
        assert_eq!(result.expired, vec![c]);
    }

    #[test]
    fn test_classify_empty() {
        let result = classify(Vec::new(), now());
        assert!(!result.any_expired());
        assert!(result.expired.is_empty());
        assert!(result.unexpired.is_empty());
    }

    #[test]
    fn test_classify_keeps_order_and_partitions() {
        let leaf = cert(&[], "leaf", now() - Duration::days(10), now() - Duration::days(1));
        let inter = cert(&["CA"], "inter", now() - Duration::days(10), now() + Duration::days(10));
        let root = cert(&["CA"], "root", now() + Duration::days(1), now() + Duration::days(10));
        let other = cert(&["CA"], "other", now() - Duration::days(1), now() + Duration::days(1));

        let result = classify(
            vec![leaf.clone(), inter.clone(), root.clone(), other.clone()],
            now(),
        );

        assert!(result.any_expired());
        assert_eq!(result.expired, vec![leaf, root]);
        assert_eq!(result.unexpired, vec![inter, other]);
    }

    #[test]
    fn test_display_format() {
        let c = cert(
            &[],
            "a",
            Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap(),
            Utc.with_ymd_and_hms(2021, 11, 12, 13, 14, 15).unwrap(),
        );
        assert_eq!(c.not_before_display(), "2020-01-02 03:04:05");
        assert_eq!(c.not_after_display(), "2021-11-12 13:14:15");
    }
}
