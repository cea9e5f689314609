use app_core::extractors::AppPath;
use axum::debug_handler;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect};
use tower_cookies::cookie::{SameSite, time};
use tower_cookies::{Cookie, Cookies};

use super::COOKIE_PKCE_VERIFIER;
use crate::domain::inout::prelude::*;
use crate::inbound::state::AuthState;

#[debug_handler]
pub async fn social_login(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppPath(provider): AppPath<String>,
) -> impl IntoResponse {
    state.login.social_login(SocialLoginInput { provider }).await.map(|output| {
        let cookie = Cookie::build((COOKIE_PKCE_VERIFIER, output.pkce_verifier))
            .http_only(true)
            .secure(true)
            .path("/")
            .max_age(time::Duration::minutes(5))
            .same_site(SameSite::Lax)
            .build();

        cookies.private(&state.cookie_key).add(cookie);

        Redirect::to(&output.auth_url)
    })
}
