use std::collections::HashMap;

use opendal::services::{Fs, Memory, S3};
use opendal::Operator;
use redolog_core::reader::RedoError;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum CloudBackend {
    S3,
}

#[derive(Debug, Clone)]
pub enum LocalBackend {
    Fs,
    Memory,
}

#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Cloud backends hosted out of process
    Cloud {
        backend: CloudBackend,
        /// A URI-like root, e.g. s3://bucket/prefix
        root: String,
        /// Optional backend-specific options (endpoint, region, credentials)
        options: HashMap<String, String>,
    },
    /// Local backends, mostly for tests and air-gapped deployments
    Local {
        backend: LocalBackend,
        /// For fs: an absolute directory like file:///var/lib/redo or /var/lib/redo
        /// For memory: a logical namespace used as a virtual root
        root: String,
    },
}

impl BackendConfig {
    /// Parse a store URI into a backend config. The scheme selects the
    /// backend; query parameters become backend options
    /// (`s3://bucket/prefix?endpoint=http://127.0.0.1:9000&region=us-east-1`).
    pub fn from_uri(uri: &str) -> Result<BackendConfig, RedoError> {
        let (base, query) = match uri.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (uri, None),
        };
        let mut options = HashMap::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some((k, v)) => {
                        options.insert(k.to_string(), v.to_string());
                    }
                    None => {
                        warn!(
                            target = "object_store",
                            "ignoring malformed query parameter '{}' in store uri", pair
                        );
                    }
                }
            }
        }

        if base.starts_with("s3://") {
            Ok(BackendConfig::Cloud {
                backend: CloudBackend::S3,
                root: base.to_string(),
                options,
            })
        } else if base.starts_with("memory://") {
            Ok(BackendConfig::Local {
                backend: LocalBackend::Memory,
                root: base.to_string(),
            })
        } else if base.starts_with("file://") || base.starts_with('/') {
            Ok(BackendConfig::Local {
                backend: LocalBackend::Fs,
                root: base.to_string(),
            })
        } else {
            Err(RedoError::ObjectStore(format!(
                "unsupported store uri scheme: {}",
                uri
            )))
        }
    }

    /// Build an OpenDAL operator plus an optional key prefix to prepend to
    /// object keys (used by the memory backend's virtual root).
    pub(crate) fn build_operator(&self) -> Result<(Operator, String), RedoError> {
        match self {
            BackendConfig::Cloud {
                backend: CloudBackend::S3,
                root,
                options,
            } => {
                let (bucket, prefix) = split_bucket_prefix(root).map_err(RedoError::ObjectStore)?;
                warn_unknown_options(
                    "s3",
                    options,
                    &["endpoint", "region", "access_key", "secret_key"],
                );
                let mut builder = S3::default().bucket(&bucket);
                if !prefix.is_empty() {
                    // S3 root must be an absolute path
                    builder = builder.root(&format!("/{}", prefix));
                }
                if let Some(endpoint) = options.get("endpoint") {
                    builder = builder.endpoint(endpoint);
                }
                if let Some(region) = options.get("region") {
                    builder = builder.region(region);
                }
                if let Some(ak) = options.get("access_key") {
                    builder = builder.access_key_id(ak);
                }
                if let Some(sk) = options.get("secret_key") {
                    builder = builder.secret_access_key(sk);
                }
                let op = Operator::new(builder)
                    .map_err(|e| RedoError::ObjectStore(format!("opendal s3 builder: {}", e)))?
                    .finish();
                Ok((op, String::new()))
            }
            BackendConfig::Local { backend, root } => match backend {
                LocalBackend::Fs => {
                    let fs_root = root.strip_prefix("file://").unwrap_or(root);
                    let builder = Fs::default().root(fs_root);
                    let op = Operator::new(builder)
                        .map_err(|e| RedoError::ObjectStore(format!("opendal fs builder: {}", e)))?
                        .finish();
                    Ok((op, String::new()))
                }
                LocalBackend::Memory => {
                    let prefix = root.strip_prefix("memory://").unwrap_or(root);
                    let builder = Memory::default();
                    let op = Operator::new(builder)
                        .map_err(|e| {
                            RedoError::ObjectStore(format!("opendal memory builder: {}", e))
                        })?
                        .finish();
                    Ok((op, normalize_prefix(prefix)))
                }
            },
        }
    }
}

fn warn_unknown_options(service: &str, options: &HashMap<String, String>, allowed: &[&str]) {
    for k in options.keys() {
        if !allowed.contains(&k.as_str()) {
            warn!(
                target = "object_store",
                "unknown {} option '{}'; accepted keys: {:?}", service, k, allowed
            );
        }
    }
}

fn split_bucket_prefix(uri: &str) -> Result<(String, String), String> {
    // Accept formats: s3://bucket, s3://bucket/prefix
    let parts: Vec<&str> = uri.splitn(2, "://").collect();
    if parts.len() == 2 {
        let rest = parts[1];
        let mut it = rest.splitn(2, '/');
        let bucket = it.next().unwrap_or("").to_string();
        if bucket.is_empty() {
            return Err(format!("invalid uri, missing bucket: {}", uri));
        }
        let prefix = it.next().unwrap_or("").to_string();
        Ok((bucket, normalize_prefix(&prefix)))
    } else {
        // No scheme: treat the entire string as a bucket with no prefix
        Ok((uri.to_string(), String::new()))
    }
}

fn normalize_prefix(p: &str) -> String {
    p.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_uri_selects_backend_by_scheme() {
        match BackendConfig::from_uri("s3://logbucket/feed?endpoint=http://127.0.0.1:9000").unwrap()
        {
            BackendConfig::Cloud { root, options, .. } => {
                assert_eq!(root, "s3://logbucket/feed");
                assert_eq!(options.get("endpoint").unwrap(), "http://127.0.0.1:9000");
            }
            other => panic!("unexpected backend: {:?}", other),
        }

        assert!(matches!(
            BackendConfig::from_uri("memory://redo-test").unwrap(),
            BackendConfig::Local {
                backend: LocalBackend::Memory,
                ..
            }
        ));
        assert!(matches!(
            BackendConfig::from_uri("/var/lib/redo").unwrap(),
            BackendConfig::Local {
                backend: LocalBackend::Fs,
                ..
            }
        ));
        assert!(BackendConfig::from_uri("ftp://nope").is_err());
    }

    #[test]
    fn split_bucket_prefix_handles_prefixes() {
        assert_eq!(
            split_bucket_prefix("s3://bucket/a/b/").unwrap(),
            ("bucket".to_string(), "a/b".to_string())
        );
        assert_eq!(
            split_bucket_prefix("s3://bucket").unwrap(),
            ("bucket".to_string(), String::new())
        );
        assert!(split_bucket_prefix("s3://").is_err());
    }
}
