/// What the orchestrator should do with a terminal response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// `200`: the body is authoritative.
    Fetched,

    /// `304`: the caller's copy is current.
    Unmodified,

    /// `404`: retrying the same resource cannot help.
    NotFound,

    /// Anything else: worth another attempt if budget remains.
    Transient,
}

/// Returns `true` for the only status whose body is written and reported.
pub fn is_success(status: u16) -> bool { status == 200 }

/// Classify the final status of one attempt.
///
/// # Examples
///
/// ```
/// use pkgfetch::core::{Disposition, classify};
///
/// assert_eq!(classify(200), Disposition::Fetched);
/// assert_eq!(classify(304), Disposition::Unmodified);
/// assert_eq!(classify(404), Disposition::NotFound);
/// assert_eq!(classify(503), Disposition::Transient);
/// ```
pub fn classify(status: u16) -> Disposition {
    match status {
        200 => Disposition::Fetched,
        304 => Disposition::Unmodified,
        404 => Disposition::NotFound,
        _ => Disposition::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_success_codes_are_transient() {
        // Only a plain 200 carries the full artifact.
        assert_eq!(classify(201), Disposition::Transient);
        assert_eq!(classify(204), Disposition::Transient);
        assert_eq!(classify(206), Disposition::Transient);
    }

    #[test]
    fn test_unfollowed_redirects_are_transient() {
        for code in [301, 302, 303, 307, 308] {
            assert_eq!(classify(code), Disposition::Transient, "code {code}");
        }
    }

    #[test]
    fn test_client_and_server_errors() {
        assert_eq!(classify(403), Disposition::Transient);
        assert_eq!(classify(410), Disposition::Transient);
        assert_eq!(classify(500), Disposition::Transient);
        assert_eq!(classify(502), Disposition::Transient);
    }

    #[test]
    fn test_is_success() {
        assert!(is_success(200));
        assert!(!is_success(0));
        assert!(!is_success(304));
        assert!(!is_success(404));
    }
}
