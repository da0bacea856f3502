//! Remaining validity of PEM encoded issuer certificates.

use crate::error::CertificateError;
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::x509::X509;

const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the number of seconds until the certificate's "not after" date.
///
/// The value is negative once the certificate has expired.
///
/// # Example
///
/// ```no_run
/// # use vault_pki_exporter::certificate::remaining_validity_seconds;
/// let pem = std::fs::read_to_string("issuer.pem")?;
/// let seconds = remaining_validity_seconds(&pem)?;
/// println!("issuer expires in {}s", seconds);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn remaining_validity_seconds(pem: &str) -> Result<i64, CertificateError> {
    let certificate = X509::from_pem(pem.as_bytes()).map_err(|e| CertificateError::Parse {
        details: e.to_string(),
    })?;
    seconds_until(certificate.not_after())
}

fn seconds_until(not_after: &Asn1TimeRef) -> Result<i64, CertificateError> {
    let now = Asn1Time::days_from_now(0).map_err(|e| CertificateError::Time {
        details: e.to_string(),
    })?;
    let diff = now.diff(not_after).map_err(|e| CertificateError::Time {
        details: e.to_string(),
    })?;
    Ok(i64::from(diff.days) * SECONDS_PER_DAY + i64::from(diff.secs))
}
