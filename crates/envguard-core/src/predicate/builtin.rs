//! Built-in predicates
//!
//! Network and filesystem probes commonly needed when checking a service's
//! environment. They are only available through
//! [`PredicateRegistry::with_builtins`](super::PredicateRegistry::with_builtins).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::{AsyncPredicate, PredicateError};

pub const DNS_RESOLVABLE: &str = "dns-resolvable";
pub const TCP_REACHABLE: &str = "tcp-reachable";
pub const PATH_EXISTS: &str = "path-exists";

/// Default connect deadline for `tcp-reachable`
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

pub(super) fn all() -> Vec<(&'static str, Arc<dyn AsyncPredicate>)> {
    vec![
        (DNS_RESOLVABLE, Arc::new(DnsResolvable) as Arc<dyn AsyncPredicate>),
        (TCP_REACHABLE, Arc::new(TcpReachable) as Arc<dyn AsyncPredicate>),
        (PATH_EXISTS, Arc::new(PathExists) as Arc<dyn AsyncPredicate>),
    ]
}

fn expect_string(value: &Value) -> Result<&str, PredicateError> {
    value
        .as_str()
        .ok_or_else(|| PredicateError::new("must be a string"))
}

/// Split `host:port`, leaving bare hosts and IPv6 literals intact
fn split_host_port(raw: &str) -> (&str, Option<u16>) {
    if raw.parse::<IpAddr>().is_ok() {
        return (raw, None);
    }
    if let Some(inner) = raw.strip_prefix('[') {
        if let Some((host, rest)) = inner.split_once(']') {
            let port = rest.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
    }
    match raw.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (raw, None),
        },
        None => (raw, None),
    }
}

/// The value is a host name (optionally `host:port`) that resolves
pub struct DnsResolvable;

#[async_trait]
impl AsyncPredicate for DnsResolvable {
    async fn check(&self, value: &Value, _params: &Value) -> Result<bool, PredicateError> {
        let raw = expect_string(value)?;
        let (host, port) = split_host_port(raw);

        if host.parse::<IpAddr>().is_ok() {
            return Ok(true);
        }
        if host.is_empty() {
            return Ok(false);
        }

        match tokio::net::lookup_host((host, port.unwrap_or(0))).await {
            Ok(mut addrs) => Ok(addrs.next().is_some()),
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "DNS lookup failed");
                Err(PredicateError::new(format!("host '{}' does not resolve", host))
                    .with_params(json!({ "host": host })))
            }
        }
    }
}

/// The value is a `host:port` accepting TCP connections
///
/// Params: `{ "timeout_ms": u64 }`, default 2000.
pub struct TcpReachable;

#[async_trait]
impl AsyncPredicate for TcpReachable {
    async fn check(&self, value: &Value, params: &Value) -> Result<bool, PredicateError> {
        let raw = expect_string(value)?;
        let (host, port) = split_host_port(raw);
        let port = port.ok_or_else(|| {
            PredicateError::new("must be in host:port form").with_params(json!({ "value": raw }))
        })?;

        let limit = Duration::from_millis(
            params
                .get("timeout_ms")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
        );

        let connect = async {
            match host.parse::<IpAddr>() {
                Ok(ip) => tokio::net::TcpStream::connect(SocketAddr::new(ip, port)).await,
                Err(_) => tokio::net::TcpStream::connect((host, port)).await,
            }
        };

        match timeout(limit, connect).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(PredicateError::new(format!(
                "cannot connect to {}:{}: {}",
                host, port, e
            ))
            .with_params(json!({ "host": host, "port": port }))),
            Err(_) => Err(PredicateError::timeout(limit)),
        }
    }
}

/// The value is a filesystem path that exists
///
/// Params: `{ "kind": "file" | "dir" }` narrows the accepted entry type.
pub struct PathExists;

#[async_trait]
impl AsyncPredicate for PathExists {
    async fn check(&self, value: &Value, params: &Value) -> Result<bool, PredicateError> {
        let path = expect_string(value)?;

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(PredicateError::new(format!("cannot access '{}': {}", path, e)))
            }
        };

        match params.get("kind").and_then(Value::as_str) {
            Some("file") if !metadata.is_file() => {
                Err(PredicateError::new("must be a file").with_params(json!({ "kind": "file" })))
            }
            Some("dir") if !metadata.is_dir() => Err(PredicateError::new("must be a directory")
                .with_params(json!({ "kind": "dir" }))),
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("db.local:5432"), ("db.local", Some(5432)));
        assert_eq!(split_host_port("db.local"), ("db.local", None));
        assert_eq!(split_host_port("::1"), ("::1", None));
        assert_eq!(split_host_port("[::1]:80"), ("::1", Some(80)));
        assert_eq!(split_host_port("host:notaport"), ("host:notaport", None));
    }

    #[tokio::test]
    async fn test_dns_accepts_ip_literals() {
        let p = DnsResolvable;
        assert!(p.check(&json!("127.0.0.1"), &Value::Null).await.unwrap());
        assert!(p.check(&json!("127.0.0.1:8080"), &Value::Null).await.unwrap());
        assert!(p.check(&json!(42), &Value::Null).await.is_err());
    }

    #[tokio::test]
    async fn test_tcp_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let p = TcpReachable;
        assert!(p.check(&json!(addr.to_string()), &Value::Null).await.unwrap());

        drop(listener);
        let err = p
            .check(&json!(addr.to_string()), &json!({ "timeout_ms": 500 }))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("cannot connect") || err.message.contains("timed out"));

        let err = p.check(&json!("127.0.0.1"), &Value::Null).await.unwrap_err();
        assert_eq!(err.message, "must be in host:port form");
    }

    #[tokio::test]
    async fn test_path_exists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cert.pem");
        std::fs::write(&file, "x").unwrap();

        let p = PathExists;
        let file_str = json!(file.to_string_lossy());
        let dir_str = json!(dir.path().to_string_lossy());

        assert!(p.check(&file_str, &Value::Null).await.unwrap());
        assert!(p.check(&file_str, &json!({ "kind": "file" })).await.unwrap());
        assert!(p.check(&dir_str, &json!({ "kind": "file" })).await.is_err());
        assert!(p.check(&dir_str, &json!({ "kind": "dir" })).await.unwrap());

        let missing = json!(dir.path().join("missing").to_string_lossy());
        assert!(!p.check(&missing, &Value::Null).await.unwrap());
    }
}
