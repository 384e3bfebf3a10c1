//! Per-archive password derivation

/// Derive the password of one archive
///
/// The password is the lowercase hex MD5 digest of the shared secret
/// immediately followed by the archive base name (the key, without `.zip`).
/// Its ASCII bytes are used verbatim as the archive password.
///
/// # Examples
///
/// ```rust
/// use paper_kiosk::app::extract::derive_archive_password;
///
/// let password = derive_archive_password("s3cret", "haz_01-06-2024");
/// assert_eq!(password, "1234f73f2d171c2f0f3a13731d6d8926");
/// ```
pub fn derive_archive_password(secret: &str, base_name: &str) -> String {
    let mut material = String::with_capacity(secret.len() + base_name.len());
    material.push_str(secret);
    material.push_str(base_name);
    format!("{:x}", md5::compute(material.as_bytes()))
}
