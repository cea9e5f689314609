pub mod callback;
pub mod login;
pub mod messages;

/// Private cookie holding the serialized session.
pub const COOKIE_SESSION: &str = "__session";
/// Private cookie holding the PKCE verifier between login start and callback.
pub const COOKIE_PKCE_VERIFIER: &str = "__pkce_verifier";
