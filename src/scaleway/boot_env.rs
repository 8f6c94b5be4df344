//! Boot-time tag formatting for the Scaleway driver.
//!
//! Legacy Scaleway images surface server tags as environment variables
//! during first boot. The SSH public key rides in as a single
//! `AUTHORIZED_KEY=…` token with its inner spaces folded to underscores,
//! followed by any user-supplied tags.

/// Tag key the boot image recognises for SSH key injection.
pub const AUTHORIZED_KEY_TAG: &str = "AUTHORIZED_KEY";

/// Formats a public-key line into the boot tag consumed at first boot.
///
/// The key's trailing newline is dropped and internal spaces become
/// underscores so the whole key survives as one token.
#[must_use]
pub fn authorized_key_tag(public_key: &str) -> String {
    let key = public_key.trim_end_matches(['\r', '\n']).replace(' ', "_");
    format!("{AUTHORIZED_KEY_TAG}={key}")
}

/// Splits a comma-separated tag list, trimming whitespace and dropping
/// empty entries.
#[must_use]
pub fn tag_list(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Builds the full tag set for a server creation request: the authorized
/// key token first, then the user tags in their given order.
#[must_use]
pub fn boot_tags(public_key: &str, tags: &str) -> Vec<String> {
    let mut all = vec![authorized_key_tag(public_key)];
    all.extend(tag_list(tags));
    all
}
