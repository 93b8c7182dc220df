use url::Url;

/// Returns `true` if both URLs share scheme, host and effective port.
///
/// Redirects are only followed transparently within one origin; a hop to
/// another origin ends the attempt with the redirect status.
///
/// # Examples
///
/// ```
/// use pkgfetch::core::is_same_origin;
/// use url::Url;
///
/// let a = Url::parse("http://pkg.example.org/All/a.pkg").unwrap();
/// let b = Url::parse("http://pkg.example.org:80/Latest/a.pkg").unwrap();
/// let c = Url::parse("https://pkg.example.org/All/a.pkg").unwrap();
///
/// assert!(is_same_origin(&a, &b));
/// assert!(!is_same_origin(&a, &c));
/// ```
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url { Url::parse(s).unwrap() }

    #[test]
    fn test_path_and_query_do_not_matter() {
        assert!(is_same_origin(
            &url("http://a.example/x?y=1"),
            &url("http://a.example/other/path")
        ));
    }

    #[test]
    fn test_host_mismatch() {
        assert!(!is_same_origin(&url("http://a.example/x"), &url("http://b.example/x")));
    }

    #[test]
    fn test_port_mismatch() {
        assert!(!is_same_origin(&url("http://a.example:8080/x"), &url("http://a.example/x")));
        assert!(is_same_origin(&url("https://a.example:443/x"), &url("https://a.example/x")));
    }
}
