use app_core::config::Config;
use app_core::identity::Session;
use axum::debug_handler;
use axum::extract::{OriginalUri, State};
use axum::response::Redirect;
use tower_cookies::cookie::{SameSite, time};
use tower_cookies::{Cookie, Cookies};

use super::{COOKIE_PKCE_VERIFIER, COOKIE_SESSION};
use crate::domain::inout::prelude::*;
use crate::inbound::state::AuthState;

const SESSION_MAX_AGE_DAYS: i64 = 7;

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// `app.base_url`, or relative redirects when it is unset or unreadable.
fn base_url(config: &Config) -> String {
    config.get_or("app.base_url", String::new()).unwrap_or_else(|e| {
        tracing::warn!("Invalid app.base_url, using relative redirects: {:?}", e);
        String::new()
    })
}

#[debug_handler]
pub async fn auth_callback(
    State(state): State<AuthState>,
    cookies: Cookies,
    OriginalUri(uri): OriginalUri,
) -> Redirect {
    let private = cookies.private(&state.cookie_key);

    let session = private.get(COOKIE_SESSION).and_then(|cookie| {
        serde_json::from_str::<Session>(cookie.value())
            .inspect_err(|e| tracing::warn!("Ignoring malformed session cookie: {:?}", e))
            .ok()
    });
    let code_verifier = private.get(COOKIE_PKCE_VERIFIER).map(|cookie| cookie.value().to_string());

    let output = state.callback.handle_callback(CallbackInput { uri: uri.to_string(), session, code_verifier }).await;

    tracing::debug!(
        trail = ?output.trail,
        failed = output.error.is_some(),
        warnings = output.warnings.len(),
        "Callback flow finished"
    );

    private.remove(removal(COOKIE_PKCE_VERIFIER));

    match output.session.as_ref().map(serde_json::to_string) {
        Some(Ok(value)) => {
            let cookie = Cookie::build((COOKIE_SESSION, value))
                .http_only(true)
                .secure(true)
                .path("/")
                .max_age(time::Duration::days(SESSION_MAX_AGE_DAYS))
                .same_site(SameSite::Lax)
                .build();
            private.add(cookie);
        },
        Some(Err(e)) => {
            tracing::error!("Failed to serialize session cookie: {:?}", e);
            private.remove(removal(COOKIE_SESSION));
        },
        None => private.remove(removal(COOKIE_SESSION)),
    }

    Redirect::to(&output.redirect.location(&base_url(&state.config)))
}
