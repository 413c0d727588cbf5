//! Domain rules for the site mapper
//!
//! This module normalizes and validates domain strings and classifies links
//! found on a crawled site as internal, external, or binary.

mod matcher;
mod normalize;

pub use matcher::{
    canonicalize_for_domain, has_binary_extension, is_external_link, is_same_site_host,
    BINARY_EXTENSIONS,
};
pub use normalize::{is_valid_domain, normalize_domain, raw_domain};

/// Normalizes a domain and rejects it when it is not a fully qualified name
///
/// # Examples
///
/// ```
/// use site_mapper::domain::validated_domain;
///
/// assert_eq!(validated_domain("HTTP://Example.com/about"), Some("example.com".to_string()));
/// assert_eq!(validated_domain("localhost"), None);
/// ```
pub fn validated_domain(input: &str) -> Option<String> {
    let domain = normalize_domain(input);
    if is_valid_domain(&domain) {
        Some(domain)
    } else {
        None
    }
}
