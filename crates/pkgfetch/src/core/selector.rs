use url::Url;

use crate::data::{Candidate, SrvRecord};
use crate::error::{FetchError, Result};

/// Repository URLs may carry a `pkg+` marker in front of the real scheme.
const SCHEME_PREFIX: &str = "pkg+";

/// Strip a leading `pkg+` scheme marker, case-insensitively.
pub fn strip_scheme_prefix(url: &str) -> &str {
    match url.get(..SCHEME_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME_PREFIX) => &url[SCHEME_PREFIX.len()..],
        _ => url,
    }
}

/// The discovery service name for a repository: `_http._tcp.<host>`.
///
/// # Examples
///
/// ```
/// use pkgfetch::core::service_name;
///
/// let name = service_name("pkg+http://pkg.example.org/FreeBSD:14:amd64").unwrap();
/// assert_eq!(name, "_http._tcp.pkg.example.org");
/// ```
pub fn service_name(repo_url: &str) -> Result<String> {
    let url = parse(repo_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::invalid_url(repo_url, "missing host"))?;
    Ok(format!("_http._tcp.{host}"))
}

/// Re-home an item URL onto a static mirror.
///
/// When the item lives under the repository URL, the part below the
/// repository root is appended to the mirror URL. Otherwise only the
/// origin changes and the item's path and query are kept.
pub fn rebase_url(item: &Url, repo_url: &str, mirror: &str) -> Result<Url> {
    let repo = strip_scheme_prefix(repo_url).trim_end_matches('/');
    let mirror_base = strip_scheme_prefix(mirror).trim_end_matches('/');

    if let Some(rest) = item.as_str().strip_prefix(repo)
        && !repo.is_empty()
        && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    {
        return parse(&format!("{mirror_base}{rest}"));
    }

    let mut url = parse(mirror)?;
    url.set_path(item.path());
    url.set_query(item.query());
    Ok(url)
}

fn parse(url: &str) -> Result<Url> {
    Url::parse(strip_scheme_prefix(url)).map_err(|e| FetchError::invalid_url(url, e))
}

/// Round-robin position over `len` mirrors; wraps to the head after the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorCursor {
    next: usize,
    len:  usize,
}

impl MirrorCursor {
    pub fn new(len: usize) -> Self { Self { next: 0, len } }

    /// Index of the mirror for the next attempt, `None` if there are none.
    pub fn advance(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let index = self.next;
        self.next = (self.next + 1) % self.len;
        Some(index)
    }
}

/// Candidate producer for one fetch call, advanced once per attempt.
#[derive(Debug, Clone)]
pub enum MirrorSelector {
    /// Every attempt uses the item URL.
    Direct(Url),

    /// Discovered endpoints; only host and port vary across attempts.
    Endpoints {
        template: Url,
        records:  Vec<SrvRecord>,
        cursor:   MirrorCursor,
    },

    /// Static mirrors, already rebased onto the item.
    Urls { urls: Vec<Url>, cursor: MirrorCursor },
}

impl MirrorSelector {
    pub fn direct(item: Url) -> Self { MirrorSelector::Direct(item) }

    /// Build a selector over discovered records.
    ///
    /// The item's path and query are extracted once here and re-applied to
    /// every record. No records degrades to [`MirrorSelector::Direct`].
    pub fn endpoints(repo_url: &str, item: &Url, records: Vec<SrvRecord>) -> Result<Self> {
        if records.is_empty() {
            return Ok(MirrorSelector::Direct(item.clone()));
        }
        let mut template = parse(repo_url)?;
        template.set_path(item.path());
        template.set_query(item.query());
        let cursor = MirrorCursor::new(records.len());
        Ok(MirrorSelector::Endpoints {
            template,
            records,
            cursor,
        })
    }

    /// Build a selector over a static mirror list; empty behaves as direct.
    pub fn static_list(repo_url: &str, item: &Url, mirrors: &[String]) -> Result<Self> {
        if mirrors.is_empty() {
            return Ok(MirrorSelector::Direct(item.clone()));
        }
        let urls = mirrors
            .iter()
            .map(|mirror| rebase_url(item, repo_url, mirror))
            .collect::<Result<Vec<_>>>()?;
        let cursor = MirrorCursor::new(urls.len());
        Ok(MirrorSelector::Urls { urls, cursor })
    }

    /// Number of distinct candidates this selector cycles through.
    pub fn len(&self) -> usize {
        match self {
            MirrorSelector::Direct(_) => 1,
            MirrorSelector::Endpoints { records, .. } => records.len(),
            MirrorSelector::Urls { urls, .. } => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The candidate for the next attempt.
    pub fn next_candidate(&mut self) -> Result<Candidate> {
        match self {
            MirrorSelector::Direct(url) => Ok(Candidate::Url(url.clone())),
            MirrorSelector::Endpoints {
                template,
                records,
                cursor,
            } => {
                let record = cursor
                    .advance()
                    .and_then(|index| records.get(index))
                    .ok_or_else(|| FetchError::invalid_url(template.as_str(), "no mirror records"))?;
                let mut url = template.clone();
                url.set_host(Some(&record.host))
                    .map_err(|e| FetchError::invalid_url(&record.host, e))?;
                url.set_port(Some(record.port))
                    .map_err(|()| FetchError::invalid_url(template.as_str(), "URL cannot carry a port"))?;
                Ok(Candidate::Endpoint {
                    host: record.host.clone(),
                    port: record.port,
                    url,
                })
            }
            MirrorSelector::Urls { urls, cursor } => cursor
                .advance()
                .and_then(|index| urls.get(index))
                .map(|url| Candidate::Url(url.clone()))
                .ok_or_else(|| FetchError::invalid_url("", "no mirror URLs")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url { Url::parse(s).unwrap() }

    #[test]
    fn test_strip_scheme_prefix() {
        assert_eq!(strip_scheme_prefix("pkg+http://a/b"), "http://a/b");
        assert_eq!(strip_scheme_prefix("PKG+https://a/b"), "https://a/b");
        assert_eq!(strip_scheme_prefix("http://a/b"), "http://a/b");
        assert_eq!(strip_scheme_prefix("pk"), "pk");
    }

    #[test]
    fn test_service_name_rejects_garbage() {
        assert!(matches!(service_name("not a url"), Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn test_cursor_wraps() {
        let mut cursor = MirrorCursor::new(3);
        let order: Vec<_> = (0..7).filter_map(|_| cursor.advance()).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = MirrorCursor::new(0);
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn test_endpoints_apply_item_path_to_each_host() {
        let item = url("http://pkg.example.org/repo/All/zsh-5.9.pkg?x=1");
        let records = vec![
            SrvRecord::new("m1.example.org", 80),
            SrvRecord::new("m2.example.org", 8080),
        ];
        let mut selector =
            MirrorSelector::endpoints("pkg+http://pkg.example.org/repo", &item, records).unwrap();

        let first = selector.next_candidate().unwrap();
        assert_eq!(first.url().as_str(), "http://m1.example.org/repo/All/zsh-5.9.pkg?x=1");

        let second = selector.next_candidate().unwrap();
        assert_eq!(second.url().as_str(), "http://m2.example.org:8080/repo/All/zsh-5.9.pkg?x=1");
        assert_eq!(second.to_string(), "m2.example.org:8080");

        let third = selector.next_candidate().unwrap();
        assert_eq!(third, first);
    }

    #[test]
    fn test_endpoints_without_records_is_direct() {
        let item = url("http://pkg.example.org/a.pkg");
        let mut selector = MirrorSelector::endpoints("http://pkg.example.org", &item, vec![]).unwrap();
        assert!(!selector.is_empty());
        assert_eq!(selector.next_candidate().unwrap(), Candidate::Url(item));
    }

    #[test]
    fn test_direct_repeats_item() {
        let item = url("http://mirror/pkg.txz");
        let mut selector = MirrorSelector::direct(item.clone());
        for _ in 0..3 {
            assert_eq!(selector.next_candidate().unwrap().url(), &item);
        }
        assert_eq!(selector.len(), 1);
    }

    #[test]
    fn test_rebase_under_repository_root() {
        let item = url("http://pkg.example.org/FreeBSD/latest/All/a.pkg");
        let rebased = rebase_url(
            &item,
            "pkg+http://pkg.example.org/FreeBSD/latest/",
            "https://mirror.example.net/pub/pkg",
        )
        .unwrap();
        assert_eq!(rebased.as_str(), "https://mirror.example.net/pub/pkg/All/a.pkg");
    }

    #[test]
    fn test_rebase_requires_path_boundary() {
        let item = url("http://pkg.example.org/repository/a.pkg");
        let rebased = rebase_url(&item, "http://pkg.example.org/repo", "http://m.example.net/base").unwrap();
        assert_eq!(rebased.as_str(), "http://m.example.net/repository/a.pkg");
    }

    #[test]
    fn test_static_list_round_robin() {
        let item = url("http://pkg.example.org/repo/a.pkg");
        let mirrors = vec!["http://m1/repo".to_string(), "http://m2/repo".to_string()];
        let mut selector = MirrorSelector::static_list("http://pkg.example.org/repo", &item, &mirrors).unwrap();
        let hosts: Vec<_> = (0..3)
            .map(|_| selector.next_candidate().unwrap().url().host_str().unwrap().to_string())
            .collect();
        assert_eq!(hosts, vec!["m1", "m2", "m1"]);
    }

    #[test]
    fn test_static_list_empty_is_direct() {
        let item = url("http://pkg.example.org/repo/a.pkg");
        let selector = MirrorSelector::static_list("http://pkg.example.org/repo", &item, &[]).unwrap();
        assert!(matches!(selector, MirrorSelector::Direct(_)));
    }

    #[test]
    fn test_static_list_rejects_bad_mirror() {
        let item = url("http://pkg.example.org/repo/a.pkg");
        let mirrors = vec!["::nonsense::".to_string()];
        assert!(MirrorSelector::static_list("http://pkg.example.org/repo", &item, &mirrors).is_err());
    }
}
