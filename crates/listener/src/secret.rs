//! Resolution of per-provider webhook secrets.
//!
//! A secret is resolved once at startup from an explicit value or an
//! environment variable. Whatever the source, a value naming an existing file
//! is replaced by that file's contents.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Verification secret for one provider.
///
/// The bytes are never printed; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSecret(Vec<u8>);

impl ProviderSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for ProviderSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProviderSecret(<redacted>)")
    }
}

/// Errors produced while resolving a secret.
#[derive(Debug, Error)]
pub enum SecretError {
    /// No explicit value was given and the environment variable is unset.
    #[error("unable to resolve secret: {env_var} is not set")]
    Unresolved { env_var: String },

    /// The value named a file that could not be read.
    #[error("unable to read secret file {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resolved secret is empty.
    #[error("secret resolved from {source_name} is empty")]
    Empty { source_name: String },
}

/// Resolves a secret from `explicit`, falling back to the process environment.
///
/// # Errors
///
/// See [`resolve_secret_with`].
pub fn resolve_secret(explicit: Option<&str>, env_var: &str) -> Result<ProviderSecret, SecretError> {
    resolve_secret_with(explicit, env_var, |name| std::env::var(name).ok())
}

/// Resolves a secret using `lookup` in place of the process environment.
///
/// `explicit` wins over `env_var`. If the chosen value is the path of an
/// existing file, the file's contents with surrounding whitespace trimmed
/// become the secret.
///
/// # Errors
///
/// - [`SecretError::Unresolved`] if neither source yields a value.
/// - [`SecretError::Unreadable`] if the value names a file that cannot be read.
/// - [`SecretError::Empty`] if the result is empty.
pub fn resolve_secret_with<F>(
    explicit: Option<&str>,
    env_var: &str,
    lookup: F,
) -> Result<ProviderSecret, SecretError>
where
    F: Fn(&str) -> Option<String>,
{
    let (value, source_name) = match explicit {
        Some(value) => (value.to_string(), "explicit value".to_string()),
        None => {
            tracing::debug!(env_var, "Resolving secret from environment");
            let value = lookup(env_var).ok_or_else(|| SecretError::Unresolved {
                env_var: env_var.to_string(),
            })?;
            (value, env_var.to_string())
        }
    };

    let path = Path::new(&value);
    let bytes = if path.is_file() {
        tracing::info!(path = %path.display(), "Reading secret from file");
        let contents = std::fs::read(path).map_err(|source| SecretError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        contents.trim_ascii().to_vec()
    } else {
        value.into_bytes()
    };

    if bytes.is_empty() {
        return Err(SecretError::Empty { source_name });
    }

    tracing::info!(source = %source_name, "Resolved webhook secret");
    Ok(ProviderSecret::new(bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_value_wins() {
        let secret =
            resolve_secret_with(Some("hunter2"), "UNUSED", |_| Some("env".into())).unwrap();
        assert_eq!(secret.as_bytes(), b"hunter2");
    }

    #[test]
    fn test_falls_back_to_environment() {
        let secret = resolve_secret_with(None, "GITHUB_WEBHOOK_SECRET", |name| {
            (name == "GITHUB_WEBHOOK_SECRET").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(secret.as_bytes(), b"from-env");
    }

    #[test]
    fn test_unresolved_names_the_variable() {
        let err = resolve_secret_with(None, "BUILDKITE_WEBHOOK_SECRET", no_env).unwrap_err();
        assert!(matches!(err, SecretError::Unresolved { env_var } if env_var == "BUILDKITE_WEBHOOK_SECRET"));
    }

    #[test]
    fn test_file_path_is_read_and_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let explicit = resolve_secret_with(Some(path.as_str()), "UNUSED", no_env).unwrap();
        assert_eq!(explicit.as_bytes(), b"from-file");

        let via_env = resolve_secret_with(None, "SECRET_PATH", |_| Some(path.clone())).unwrap();
        assert_eq!(via_env.as_bytes(), b"from-file");
    }

    #[test]
    fn test_empty_secret_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert!(matches!(
            resolve_secret_with(Some(path.as_str()), "UNUSED", no_env),
            Err(SecretError::Empty { .. })
        ));
        assert!(matches!(
            resolve_secret_with(Some(""), "UNUSED", no_env),
            Err(SecretError::Empty { .. })
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = ProviderSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
