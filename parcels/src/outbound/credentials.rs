//! Token-file credential provider.
//!
//! A signed-in session is represented by a file holding the bearer token.
//! No configured path, a missing file, or an empty file all mean guest access.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};

use crate::domain::BearerToken;
use crate::domain::ports::{CredentialProvider, CredentialProviderError};

/// Credential provider reading a bearer token from a file on every lookup.
#[derive(Debug, Clone, Default)]
pub struct TokenFileCredentials {
    path: Option<PathBuf>,
}

impl TokenFileCredentials {
    /// Read tokens from `path`; `None` always yields guest access.
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn read_token(path: &Path) -> Result<Option<BearerToken>, CredentialProviderError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            CredentialProviderError::unavailable(format!(
                "{} does not name a file",
                path.display()
            ))
        })?;

        let directory = match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(directory) => directory,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(unavailable(path, &error)),
        };
        let raw = match directory.read_to_string(Path::new(file_name)) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(unavailable(path, &error)),
        };

        let token = raw.trim();
        if token.chars().any(char::is_whitespace) {
            return Err(CredentialProviderError::malformed(format!(
                "{} holds more than one token",
                path.display()
            )));
        }
        Ok(BearerToken::new(token))
    }
}

#[async_trait]
impl CredentialProvider for TokenFileCredentials {
    async fn current_token(&self) -> Result<Option<BearerToken>, CredentialProviderError> {
        match &self.path {
            Some(path) => Self::read_token(path),
            None => Ok(None),
        }
    }
}

fn unavailable(path: &Path, error: &io::Error) -> CredentialProviderError {
    CredentialProviderError::unavailable(format!("{}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    //! Unit tests for the token-file credential provider.

    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn token_file(contents: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("token");
        let dir = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open temp dir");
        dir.write("token", contents).expect("write token");
        (temp, path)
    }

    #[tokio::test]
    async fn no_configured_path_is_guest() {
        let provider = TokenFileCredentials::default();

        assert_eq!(provider.current_token().await, Ok(None));
    }

    #[tokio::test]
    async fn missing_file_is_guest() {
        let temp = TempDir::new().expect("temp dir");
        let provider = TokenFileCredentials::new(Some(temp.path().join("absent")));

        assert_eq!(provider.current_token().await, Ok(None));
    }

    #[tokio::test]
    async fn missing_parent_directory_is_guest() {
        let temp = TempDir::new().expect("temp dir");
        let provider = TokenFileCredentials::new(Some(temp.path().join("gone/token")));

        assert_eq!(provider.current_token().await, Ok(None));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace(" \n\t")]
    #[tokio::test]
    async fn blank_file_is_guest(#[case] contents: &str) {
        let (_temp, path) = token_file(contents);
        let provider = TokenFileCredentials::new(Some(path));

        assert_eq!(provider.current_token().await, Ok(None));
    }

    #[tokio::test]
    async fn trimmed_token_is_returned() {
        let (_temp, path) = token_file("  eyJhbGciOi.payload.sig\n");
        let provider = TokenFileCredentials::new(Some(path));

        let token = provider
            .current_token()
            .await
            .expect("lookup")
            .expect("token present");

        assert_eq!(token.expose(), "eyJhbGciOi.payload.sig");
    }

    #[tokio::test]
    async fn multiple_tokens_are_malformed() {
        let (_temp, path) = token_file("first second");
        let provider = TokenFileCredentials::new(Some(path));

        let error = provider.current_token().await.expect_err("malformed");

        assert!(matches!(error, CredentialProviderError::Malformed { .. }));
    }
}
