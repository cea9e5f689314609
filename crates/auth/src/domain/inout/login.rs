use validator::Validate;

// ╔════════════════════════════╗
// ║       Social Login         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct SocialLoginInput {
    #[validate(length(min = 1, max = 32, message = "must be between 1 and 32 characters"))]
    pub provider: String,
}

#[derive(Debug)]
pub struct SocialLoginOutput {
    pub auth_url: String,
    pub pkce_verifier: String,
}
