//! Explicit cluster credentials
//!
//! Credentials are loaded once at startup and handed to [`super::connect`];
//! nothing here is stored globally.

use std::fmt;
use std::io::Read;
use std::path::Path;

use base64::Engine;
use kube::config::Kubeconfig;
use serde_json::json;

use crate::error::{Error, Result};

pub const DEFAULT_CA_PATH: &str = "/etc/kubernetes/ssl/ca.pem";
pub const DEFAULT_KUBECONFIG_PATH: &str = "/etc/kubernetes/ssl/kubeconfig";

const CONTEXT_NAME: &str = "fleet-agent";

#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
    ca_pem: Option<Vec<u8>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl Credentials {
    pub fn new(token: Option<String>, ca_pem: Option<Vec<u8>>) -> Self {
        Self { token, ca_pem }
    }

    /// Load credentials from the configured sources.
    ///
    /// A token file takes precedence over stdin. The CA file is optional and
    /// silently skipped when it does not exist.
    pub fn load(
        token_file: Option<&Path>,
        token_stdin: bool,
        ca_file: Option<&Path>,
    ) -> Result<Self> {
        let token = match token_file {
            Some(path) => Some(read_token(std::fs::File::open(path)?)?),
            None if token_stdin => Some(read_token(std::io::stdin().lock())?),
            None => None,
        };

        let ca_pem = match ca_file {
            Some(path) if path.exists() => Some(std::fs::read(path)?),
            _ => None,
        };

        Ok(Self { token, ca_pem })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn ca_pem(&self) -> Option<&[u8]> {
        self.ca_pem.as_deref()
    }

    /// Value for an HTTP `Authorization` header, if a token is present
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    /// Build a single-context kubeconfig pointing at `server`
    pub fn to_kubeconfig(&self, server: &str) -> Result<Kubeconfig> {
        let mut cluster = json!({ "server": server });
        if let Some(ca) = &self.ca_pem {
            cluster["certificate-authority-data"] =
                json!(base64::engine::general_purpose::STANDARD.encode(ca));
        }

        let mut user = json!({});
        if let Some(token) = &self.token {
            user["token"] = json!(token);
        }

        let kubeconfig = json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": [{ "name": CONTEXT_NAME, "cluster": cluster }],
            "users": [{ "name": CONTEXT_NAME, "user": user }],
            "contexts": [{
                "name": CONTEXT_NAME,
                "context": { "cluster": CONTEXT_NAME, "user": CONTEXT_NAME }
            }],
            "current-context": CONTEXT_NAME,
        });

        Ok(serde_json::from_value(kubeconfig)?)
    }
}

/// Read a bearer token, trimming surrounding whitespace
pub fn read_token<R: Read>(mut reader: R) -> Result<String> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::ConfigError("No token passed in".to_string()));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_token_trims() {
        let token = read_token("  abc123\n".as_bytes()).unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_read_token_rejects_empty() {
        assert!(matches!(
            read_token(" \n".as_bytes()),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        let ca_path = dir.path().join("ca.pem");
        std::fs::File::create(&token_path)
            .unwrap()
            .write_all(b"secret-token\n")
            .unwrap();
        std::fs::write(&ca_path, b"-----BEGIN CERTIFICATE-----").unwrap();

        let creds = Credentials::load(Some(&token_path), false, Some(&ca_path)).unwrap();
        assert_eq!(creds.token(), Some("secret-token"));
        assert_eq!(
            creds.authorization_header().as_deref(),
            Some("Bearer secret-token")
        );
        assert!(creds.ca_pem().is_some());
    }

    #[test]
    fn test_missing_ca_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let creds = Credentials::load(None, false, Some(&dir.path().join("absent.pem"))).unwrap();
        assert!(creds.token().is_none());
        assert!(creds.ca_pem().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials::new(Some("super-secret".to_string()), None);
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }

    #[tokio::test]
    async fn test_kubeconfig_points_at_server() {
        let creds = Credentials::new(Some("abc".to_string()), None);
        let kubeconfig = creds.to_kubeconfig("https://10.0.0.1:6443").unwrap();
        assert_eq!(kubeconfig.current_context.as_deref(), Some(CONTEXT_NAME));

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &Default::default())
            .await
            .unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert!(config.auth_info.token.is_some());
    }
}
