//! Input validation utilities for email addresses, URLs, and filenames.
//!
//! URL exhibits are fetched by the generation service, so URLs pointing at
//! loopback or private addresses are refused here.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Validation error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid filename: contains disallowed characters")]
    InvalidFilename,

    #[error("URL points at a local or private address: {0}")]
    DangerousUrl(String),

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Validate an email address, returning the trimmed value
pub fn validate_email(email: &str) -> Result<String, InputError> {
    let email = email.trim();
    if email.is_empty() || !email_pattern().is_match(email) {
        return Err(InputError::InvalidEmail(email.to_string()));
    }
    Ok(email.to_string())
}

/// Validate an exhibit URL
///
/// Only HTTP and HTTPS are accepted, and hosts must be publicly routable.
pub fn validate_url(url: &str) -> Result<url::Url, InputError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(InputError::InvalidUrl("empty URL".to_string()));
    }

    if url.contains('\0') || url.contains('\n') || url.contains('\r') {
        return Err(InputError::InvalidUrl("contains control characters".to_string()));
    }

    let parsed = url::Url::parse(url).map_err(|e| InputError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(InputError::InvalidUrl(format!("invalid scheme: {}", other))),
    }

    match parsed.host() {
        None => return Err(InputError::InvalidUrl("missing host".to_string())),
        Some(url::Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err(InputError::DangerousUrl(url.to_string()));
            }
        }
        Some(url::Host::Ipv4(ip)) => {
            if ip.is_loopback() || ip.is_private() || ip.is_unspecified() || ip.is_link_local() {
                return Err(InputError::DangerousUrl(url.to_string()));
            }
        }
        Some(url::Host::Ipv6(ip)) => {
            if ip.is_loopback() || ip.is_unspecified() {
                return Err(InputError::DangerousUrl(url.to_string()));
            }
        }
    }

    Ok(parsed)
}

/// Sanitize a filename before it is sent as a multipart part name
///
/// Path separators are refused; characters outside alphanumerics, dash,
/// underscore, dot and space are dropped.
pub fn sanitize_filename(filename: &str) -> Result<String, InputError> {
    let filename = filename.trim();

    if filename.is_empty() {
        return Err(InputError::InvalidFilename);
    }

    if filename.contains("..")
        || filename.starts_with('/')
        || filename.starts_with('\\')
        || filename.contains(":/")
        || filename.contains(":\\")
    {
        return Err(InputError::PathTraversal(filename.to_string()));
    }

    let mut sanitized: String = filename
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' '))
        .collect();

    const MAX_FILENAME_LENGTH: usize = 255;
    if sanitized.len() > MAX_FILENAME_LENGTH {
        let ext_pos = sanitized.rfind('.').unwrap_or(sanitized.len());
        let ext = sanitized.split_at(ext_pos).1.to_string();
        let mut base_len = MAX_FILENAME_LENGTH.saturating_sub(ext.len());
        while !sanitized.is_char_boundary(base_len) {
            base_len -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..base_len], ext);
    }

    if sanitized.is_empty() {
        return Err(InputError::InvalidFilename);
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("counsel@lawfirm.com").is_ok());
        assert_eq!(
            validate_email("  hr.team+o1@corp.example.org ").unwrap(),
            "hr.team+o1@corp.example.org"
        );
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("spaces in@example.com").is_err());
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/award.pdf").is_ok());
        assert!(validate_url("http://news.example.org/story?id=4").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(matches!(
            validate_url("http://localhost:8000"),
            Err(InputError::DangerousUrl(_))
        ));
        assert!(matches!(
            validate_url("http://192.168.1.4/file.pdf"),
            Err(InputError::DangerousUrl(_))
        ));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("award_letter.pdf").unwrap(), "award_letter.pdf");
        assert_eq!(
            sanitize_filename("Press (2023).png").unwrap(),
            "Press 2023.png"
        );
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("/etc/passwd").is_err());
        assert!(sanitize_filename("()").is_err());
    }
}
