use axum::Router;
use axum::routing::get;

use crate::inbound::http::callback::*;
use crate::inbound::http::login::*;
use crate::inbound::http::messages::*;
use crate::inbound::state::AuthState;

pub fn create_router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/callback", get(auth_callback))
        .route("/auth/social/{provider}", get(social_login))
        .route("/auth/messages/{reason}", get(reason_message))
        .with_state(state)
}
