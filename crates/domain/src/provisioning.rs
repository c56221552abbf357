use crate::SharedSecret;

/// Builds the `otpauth://` URI authenticator apps import via QR code.
///
/// Shape: `otpauth://totp/{Issuer:AccountLabel}?secret={BASE32}&issuer={Issuer}`
/// with the label and issuer percent-encoded.
#[must_use]
pub fn provisioning_uri(issuer: &str, account_label: &str, secret: &SharedSecret) -> String {
    let label = format!("{issuer}:{account_label}");

    format!(
        "otpauth://totp/{}?secret={}&issuer={}",
        urlencoding::encode(&label),
        secret.as_base32(),
        urlencoding::encode(issuer),
    )
}
