use std::sync::Arc;

use app_core::config::Config;
use app_core::error::AppError;
use app_core::identity::IdentityProvider;
use async_trait::async_trait;
use validator::Validate;

use crate::domain::inout::prelude::*;

const UNKNOWN_PROVIDER_MSG: &str = "Unknown social login provider";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait LoginUseCase: Send + Sync {
    async fn social_login(&self, input: SocialLoginInput) -> Result<SocialLoginOutput, AppError>;
}

#[derive(Clone)]
pub struct LoginService {
    config: Arc<Config>,
    identity: Arc<dyn IdentityProvider>,
}

impl LoginService {
    pub fn new(config: Arc<Config>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { config, identity }
    }

    fn is_enabled(&self, provider: &str) -> Result<bool, AppError> {
        let providers: Vec<String> = self.config.get_or("auth.providers", Vec::new())?;

        Ok(providers.iter().any(|p| p.eq_ignore_ascii_case(provider)))
    }
}

#[async_trait]
impl LoginUseCase for LoginService {
    async fn social_login(&self, input: SocialLoginInput) -> Result<SocialLoginOutput, AppError> {
        input.validate()?;

        if !self.is_enabled(&input.provider)? {
            return Err(AppError::NotFound(UNKNOWN_PROVIDER_MSG.to_string()));
        }

        let callback_url: String = self.config.get("auth.callback_url")?;
        let details = self.identity.authorization_details(&input.provider, &callback_url)?;

        Ok(SocialLoginOutput { auth_url: details.url, pkce_verifier: details.pkce_verifier })
    }
}

#[cfg(test)]
mod tests {
    use app_core::identity::{AuthorizationDetails, IdentityError, MockIdentityProvider};
    use mockall::predicate::*;

    use super::*;

    fn config() -> Arc<Config> {
        Arc::new(
            Config::builder_test()
                .with("auth.providers", vec!["google", "github"])
                .with("auth.callback_url", "https://nutrifit.example.com/auth/callback")
                .build(),
        )
    }

    fn input(provider: &str) -> SocialLoginInput {
        SocialLoginInput { provider: provider.to_string() }
    }

    #[tokio::test]
    async fn test_social_login_success() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_authorization_details()
            .with(eq("google"), eq("https://nutrifit.example.com/auth/callback"))
            .times(1)
            .returning(|_, _| {
                Ok(AuthorizationDetails {
                    url: "https://id.example.com/auth/v1/authorize?provider=google".to_string(),
                    pkce_verifier: "verifier".to_string(),
                })
            });

        let service = LoginService::new(config(), Arc::new(idp));
        let output = service.social_login(input("google")).await.unwrap();

        assert_eq!(output.auth_url, "https://id.example.com/auth/v1/authorize?provider=google");
        assert_eq!(output.pkce_verifier, "verifier");
    }

    #[tokio::test]
    async fn test_social_login_unknown_provider() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_authorization_details().never();

        let service = LoginService::new(config(), Arc::new(idp));
        let result = service.social_login(input("myspace")).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_social_login_empty_provider() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_authorization_details().never();

        let service = LoginService::new(config(), Arc::new(idp));
        let result = service.social_login(input("")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_social_login_without_configured_providers() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_authorization_details().never();

        let service = LoginService::new(Arc::new(Config::builder_test().build()), Arc::new(idp));
        let result = service.social_login(input("google")).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_social_login_provider_error() {
        let mut idp = MockIdentityProvider::new();
        idp.expect_authorization_details()
            .returning(|_, _| Err(IdentityError::Rejected("bad redirect".to_string())));

        let service = LoginService::new(config(), Arc::new(idp));
        let result = service.social_login(input("github")).await;

        assert!(matches!(result, Err(AppError::Identity(_))));
    }
}
