//! Adapter from the AWS SDK default credential chain to [`CredentialProvider`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use edgesign_auth::{AuthError, CredentialProvider, Credentials};

/// Resolves credentials through the SDK chain: environment, profile files,
/// web identity, container and instance metadata. Resolved credentials are
/// cached by the SDK until shortly before they expire.
#[derive(Debug)]
pub struct AwsChainCredentialProvider {
    provider: Option<SharedCredentialsProvider>,
}

impl AwsChainCredentialProvider {
    /// Load the shared SDK configuration and keep its credentials provider.
    pub async fn load() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_provider(config.credentials_provider())
    }

    fn from_provider(provider: Option<SharedCredentialsProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CredentialProvider for AwsChainCredentialProvider {
    async fn provide_credentials(&self) -> Result<Credentials, AuthError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            AuthError::CredentialsNotLoaded("no credentials provider configured".into())
        })?;
        let resolved = provider
            .provide_credentials()
            .await
            .map_err(|e| AuthError::CredentialsNotLoaded(e.to_string()))?;
        Ok(from_sdk(&resolved))
    }
}

fn from_sdk(resolved: &aws_credential_types::Credentials) -> Credentials {
    let credentials = Credentials::new(resolved.access_key_id(), resolved.secret_access_key());
    match resolved.session_token() {
        Some(token) => credentials.with_session_token(token),
        None => credentials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_carry_session_token_from_sdk_credentials() {
        let sdk = aws_credential_types::Credentials::new(
            "ASIAEXAMPLE",
            "secret",
            Some("token".to_owned()),
            None,
            "test",
        );

        let converted = from_sdk(&sdk);

        assert_eq!(converted.access_key_id(), "ASIAEXAMPLE");
        assert_eq!(converted.secret_access_key(), "secret");
        assert_eq!(converted.session_token(), Some("token"));
    }

    #[tokio::test]
    async fn test_should_resolve_through_shared_provider() {
        let sdk = aws_credential_types::Credentials::new(
            "ASIAEXAMPLE",
            "secret",
            Some("token".to_owned()),
            None,
            "test",
        );
        let provider =
            AwsChainCredentialProvider::from_provider(Some(SharedCredentialsProvider::new(sdk)));

        let resolved = provider.provide_credentials().await.unwrap();

        assert_eq!(resolved.access_key_id(), "ASIAEXAMPLE");
        assert_eq!(resolved.session_token(), Some("token"));
    }

    #[tokio::test]
    async fn test_should_fail_without_credentials_provider() {
        let provider = AwsChainCredentialProvider::from_provider(None);
        let result = provider.provide_credentials().await;
        assert!(matches!(result, Err(AuthError::CredentialsNotLoaded(_))));
    }

    #[test]
    fn test_should_convert_long_term_sdk_credentials() {
        let sdk = aws_credential_types::Credentials::new("AKID", "secret", None, None, "test");
        assert!(from_sdk(&sdk).session_token().is_none());
    }
}
