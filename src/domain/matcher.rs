use super::normalize::raw_domain;
use url::Url;

/// File extensions whose targets are never fetched
pub const BINARY_EXTENSIONS: &[&str] = &[
    "arc", "arj", "bin", "com", "csv", "dll", "exe", "gz", "pdf", "rar", "tar", "txt", "zip",
    "bz2", "cab", "msi", "gif", "jpg", "jpeg", "png", "mpeg", "mpg", "iso", "js", "css",
];

/// Checks if a host belongs to the site rooted at `domain`
///
/// The host matches when it equals the domain, differs only by a `www.`
/// prefix, or is a strict subdomain of the domain without `www.`.
///
/// # Examples
///
/// ```
/// use site_mapper::domain::is_same_site_host;
///
/// assert!(is_same_site_host("www.example.com", "example.com"));
/// assert!(is_same_site_host("example.com", "www.example.com"));
/// assert!(is_same_site_host("blog.example.com", "example.com"));
/// assert!(!is_same_site_host("notexample.com", "example.com"));
/// ```
pub fn is_same_site_host(host: &str, domain: &str) -> bool {
    let host = host.to_lowercase();
    let host = raw_domain(&host);
    let base = raw_domain(domain);

    if host == base {
        return true;
    }

    // Strict subdomain: something.base
    host.len() > base.len() + 1 && host.ends_with(base) && host[..host.len() - base.len()].ends_with('.')
}

/// Checks if a link points outside the site rooted at `domain`
///
/// Links that cannot be parsed or have no host are external.
pub fn is_external_link(link: &str, domain: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => match url.host_str() {
            Some(host) => !is_same_site_host(host, domain),
            None => true,
        },
        Err(_) => true,
    }
}

/// Checks if the path of a URL ends with a denylisted file extension
///
/// The extension is whatever follows the last `.` of the path and is
/// compared case-insensitively.
///
/// # Examples
///
/// ```
/// use site_mapper::domain::has_binary_extension;
///
/// assert!(has_binary_extension("http://example.com/files/report.PDF"));
/// assert!(!has_binary_extension("http://example.com/about.html"));
/// assert!(!has_binary_extension("http://example.com/"));
/// ```
pub fn has_binary_extension(link: &str) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };

    let path = url.path();
    match path.rfind('.') {
        Some(i) if i > 0 => {
            let extension = path[i + 1..].to_lowercase();
            !extension.is_empty() && BINARY_EXTENSIONS.contains(&extension.as_str())
        }
        _ => false,
    }
}

/// Rewrites a URL whose host is the `www`/non-`www` twin of `domain`
///
/// URLs already on `domain`, on other subdomains, or off-site are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use site_mapper::domain::canonicalize_for_domain;
///
/// assert_eq!(
///     canonicalize_for_domain("http://www.example.com/a", "example.com"),
///     "http://example.com/a"
/// );
/// assert_eq!(
///     canonicalize_for_domain("http://blog.example.com/a", "example.com"),
///     "http://blog.example.com/a"
/// );
/// ```
pub fn canonicalize_for_domain(link: &str, domain: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };

    let host = match url.host_str() {
        Some(host) => host.to_lowercase(),
        None => return link.to_string(),
    };

    if host == domain {
        return link.to_string();
    }

    if raw_domain(&host) == raw_domain(domain) && url.set_host(Some(domain)).is_ok() {
        return url.to_string();
    }

    link.to_string()
}
