/// Normalizes a user-supplied domain string
///
/// The input is trimmed of spaces and slashes, lowercased, and stripped of
/// any scheme, path, query, or fragment. The result is not validated; use
/// [`is_valid_domain`] for that.
///
/// # Examples
///
/// ```
/// use site_mapper::domain::normalize_domain;
///
/// assert_eq!(normalize_domain(" Example.COM/ "), "example.com");
/// assert_eq!(normalize_domain("https://www.example.com/a/b?c#d"), "www.example.com");
/// assert_eq!(normalize_domain("example.com#top"), "example.com");
/// ```
pub fn normalize_domain(input: &str) -> String {
    let mut domain = trim_domain(input).to_lowercase();

    if let Some(i) = domain.find("://") {
        domain = domain[i + 3..].to_string();
    }

    if let Some(i) = domain.find(['/', '?', '#']) {
        domain.truncate(i);
    }

    // Text between the scheme and the cut may carry its own padding
    trim_domain(&domain).to_string()
}

fn trim_domain(input: &str) -> &str {
    input.trim_matches(|c: char| c == ' ' || c == '/')
}

/// Checks that a domain is a fully qualified domain name
///
/// Labels are made of letters, digits, and hyphens, never start or end with
/// a hyphen, and are at most 63 characters long. The top-level label must be
/// at least two letters (or an `xn--` punycode label). Trailing dots, spaces,
/// and underscores are rejected.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 || domain.ends_with('.') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let tld = labels[labels.len() - 1];
    if !is_valid_tld(tld) {
        return false;
    }

    labels.iter().all(|label| is_valid_label(label))
}

fn is_valid_tld(tld: &str) -> bool {
    let lower = tld.to_lowercase();
    if let Some(rest) = lower.strip_prefix("xn") {
        if rest.len() >= 2 && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return true;
        }
    }

    tld.chars().count() >= 2
        && tld
            .chars()
            .all(|c| c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic()))
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }

    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || (!c.is_ascii() && c.is_alphanumeric()))
}

/// Strips a leading `www.` from a host
///
/// Both forms denote the same logical site.
///
/// # Examples
///
/// ```
/// use site_mapper::domain::raw_domain;
///
/// assert_eq!(raw_domain("www.example.com"), "example.com");
/// assert_eq!(raw_domain("blog.example.com"), "blog.example.com");
/// ```
pub fn raw_domain(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
