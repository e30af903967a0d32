//! Server host name resolution.

use tracing::warn;
use url::Url;

/// Host name of the server.
///
/// Taken from the canonical web URL when it is configured and valid,
/// otherwise the operating system's host name, otherwise `localhost`.
pub fn server_host(canonical_web_url: Option<&str>) -> String {
    if let Some(raw) = canonical_web_url {
        match Url::parse(raw) {
            Ok(url) => {
                if let Some(host) = url.host_str() {
                    return host.to_string();
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "configured canonical web URL is invalid, using system default"
                );
            }
        }
    }
    system_host().unwrap_or_else(|| "localhost".to_string())
}

fn system_host() -> Option<String> {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|host| !host.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_from_web_url() {
        assert_eq!(
            server_host(Some("https://review.example.com:8443/r/")),
            "review.example.com"
        );
    }

    #[test]
    fn invalid_url_falls_back() {
        let fallback = server_host(None);
        assert_eq!(server_host(Some("not a url")), fallback);
        assert!(!fallback.is_empty());
    }

    #[test]
    fn fallback_is_os_host_name() {
        let expected = system_host().unwrap_or_else(|| "localhost".to_string());
        assert_eq!(server_host(None), expected);
        assert_eq!(server_host(Some("mailto:ops@example.com")), expected);
    }
}
