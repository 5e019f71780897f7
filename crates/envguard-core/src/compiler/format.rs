//! Built-in string formats for the `format` keyword

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

/// Formats checked synchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// Email address
    Email,
    /// Absolute URI with a scheme
    Uri,
    /// Dotted-quad IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
    /// RFC 1123 host name
    Hostname,
    /// Hyphenated UUID
    Uuid,
    /// Full date, `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    DateTime,
    /// Semantic version, `major.minor.patch[-pre][+build]`
    SemVer,
    /// TCP/UDP port, 1-65535
    Port,
}

impl Format {
    pub const ALL: [Format; 10] = [
        Format::Email,
        Format::Uri,
        Format::Ipv4,
        Format::Ipv6,
        Format::Hostname,
        Format::Uuid,
        Format::Date,
        Format::DateTime,
        Format::SemVer,
        Format::Port,
    ];

    /// Resolve a format name (`url` is accepted as an alias of `uri`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "url" => Some(Format::Uri),
            _ => Self::ALL.iter().copied().find(|f| f.name() == name),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::Uri => "uri",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Hostname => "hostname",
            Format::Uuid => "uuid",
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::SemVer => "semver",
            Format::Port => "port",
        }
    }

    /// Check if a string matches this format
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Format::Email => match value.split_once('@') {
                Some((local, domain)) => {
                    !local.is_empty()
                        && !local.contains(char::is_whitespace)
                        && domain.contains('.')
                        && is_hostname(domain)
                }
                None => false,
            },
            Format::Uri => match value.split_once("://") {
                Some((scheme, rest)) => {
                    let mut chars = scheme.chars();
                    chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
                        && chars.all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                        && !rest.is_empty()
                        && !rest.contains(char::is_whitespace)
                }
                None => false,
            },
            Format::Ipv4 => value.parse::<Ipv4Addr>().is_ok(),
            Format::Ipv6 => value.parse::<Ipv6Addr>().is_ok(),
            Format::Hostname => is_hostname(value),
            // Hyphenated form only
            Format::Uuid => value.len() == 36 && Uuid::try_parse(value).is_ok(),
            Format::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            Format::DateTime => DateTime::parse_from_rfc3339(value).is_ok(),
            Format::SemVer => is_semver(value),
            Format::Port => value.parse::<u16>().map(|p| p > 0).unwrap_or(false),
        }
    }
}

fn is_hostname(value: &str) -> bool {
    let value = value.strip_suffix('.').unwrap_or(value);
    !value.is_empty()
        && value.len() <= 253
        && value.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn is_semver(value: &str) -> bool {
    let (core, _build) = value.split_once('+').unwrap_or((value, ""));
    let (core, pre) = match core.split_once('-') {
        Some((c, p)) => (c, Some(p)),
        None => (core, None),
    };

    let numeric = |p: &str| {
        !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) && (p == "0" || !p.starts_with('0'))
    };

    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| numeric(p))
        && pre.map(|p| p.split('.').all(|id| !id.is_empty())).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_resolve() {
        for format in Format::ALL {
            assert_eq!(Format::from_name(format.name()), Some(format));
        }
        assert_eq!(Format::from_name("url"), Some(Format::Uri));
        assert_eq!(Format::from_name("hexcolor"), None);
    }

    #[test]
    fn test_email() {
        assert!(Format::Email.matches("ops@example.com"));
        assert!(!Format::Email.matches("ops@localhost"));
        assert!(!Format::Email.matches("not-an-email"));
        assert!(!Format::Email.matches("@example.com"));
    }

    #[test]
    fn test_uri() {
        assert!(Format::Uri.matches("postgres://user@db:5432/app"));
        assert!(Format::Uri.matches("https://example.com"));
        assert!(!Format::Uri.matches("example.com"));
        assert!(!Format::Uri.matches("1http://x"));
    }

    #[test]
    fn test_network_formats() {
        assert!(Format::Ipv4.matches("10.0.0.1"));
        assert!(!Format::Ipv4.matches("10.0.0.256"));
        assert!(Format::Ipv6.matches("::1"));
        assert!(!Format::Ipv6.matches("10.0.0.1"));
        assert!(Format::Hostname.matches("db-1.internal"));
        assert!(!Format::Hostname.matches("-bad.host"));
        assert!(Format::Port.matches("8080"));
        assert!(!Format::Port.matches("0"));
        assert!(!Format::Port.matches("70000"));
    }

    #[test]
    fn test_time_formats() {
        assert!(Format::Date.matches("2024-02-29"));
        assert!(!Format::Date.matches("2023-02-29"));
        assert!(Format::DateTime.matches("2024-01-15T10:30:00Z"));
        assert!(!Format::DateTime.matches("2024-01-15"));
    }

    #[test]
    fn test_uuid_and_semver() {
        assert!(Format::Uuid.matches("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!Format::Uuid.matches("550e8400e29b41d4a716446655440000"));
        assert!(!Format::Uuid.matches("{550e8400-e29b-41d4-a716-446655440000}"));
        assert!(!Format::Uuid.matches("550e8400-e29b-41d4-a716-44665544000g"));
        assert!(Format::Uuid.matches("550E8400-E29B-41D4-A716-446655440000"));
        assert!(Format::SemVer.matches("1.2.3"));
        assert!(Format::SemVer.matches("1.0.0-rc.1+build.5"));
        assert!(!Format::SemVer.matches("1.2"));
        assert!(!Format::SemVer.matches("01.2.3"));
    }
}
