//! Canonical form of homepage URLs.
//!
//! Canonical URLs carry no scheme, no `www.`, no query or fragment, no trailing
//! slash or `.git`, and a lowercase host: `github.com/owner/repo`.

/// Placeholder some legacy registries store instead of an empty homepage.
const NULL_PLACEHOLDER: &str = "null";

pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NULL_PLACEHOLDER) {
        return None;
    }

    let mut rest = match trimmed.find("://") {
        Some(idx) => &trimmed[idx + 3..],
        None => trimmed,
    };
    if let Some(idx) = rest.find(['?', '#']) {
        rest = &rest[..idx];
    }
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest).trim_end_matches('/');

    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| s.chars().any(char::is_whitespace)) {
        return None;
    }

    if segments.is_empty() {
        Some(host.to_string())
    } else {
        Some(format!("{}/{}", host, segments.join("/")))
    }
}

/// A URL is canonical when normalizing it changes nothing.
pub fn is_canonical_url(url: &str) -> bool {
    normalize_url(url).is_some_and(|normalized| normalized == url)
}

/// Best guess at a project's name from its homepage: the last path segment,
/// or the whole URL when there is no path.
pub fn repo_name(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((_, last)) if !last.is_empty() => last.to_lowercase(),
        _ => url.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://github.com/example/repo").as_deref(),
            Some("github.com/example/repo")
        );
        assert_eq!(
            normalize_url("git+https://www.GitHub.com/example/repo.git#readme").as_deref(),
            Some("github.com/example/repo")
        );
        assert_eq!(
            normalize_url("http://zlib.net/?ref=brew").as_deref(),
            Some("zlib.net")
        );
        assert_eq!(
            normalize_url("  gitlab.com//group/project/  ").as_deref(),
            Some("gitlab.com/group/project")
        );
    }

    #[test]
    fn test_normalize_rejects_placeholders() {
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("   "), None);
        assert_eq!(normalize_url("null"), None);
        assert_eq!(normalize_url("https://"), None);
        assert_eq!(normalize_url("example.com/has space"), None);
    }

    #[test]
    fn test_is_canonical_url() {
        assert!(is_canonical_url("github.com/example/repo"));
        assert!(is_canonical_url("zlib.net"));
        assert!(is_canonical_url("github.com/ethereum/web3.js"));
        assert!(!is_canonical_url("https://github.com/example/repo"));
        assert!(!is_canonical_url("www.openssl.org"));
        assert!(!is_canonical_url("github.com/example/repo/"));
        assert!(!is_canonical_url("GitHub.com/example/repo"));
        assert!(!is_canonical_url("null"));
        assert!(!is_canonical_url(""));
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name("github.com/user/repo"), "repo");
        assert_eq!(repo_name("gitlab.com/user/Repo"), "repo");
        assert_eq!(repo_name("not-a-valid-url"), "not-a-valid-url");
        assert_eq!(repo_name(""), "");
    }
}
