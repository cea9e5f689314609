use std::sync::Arc;

use app_core::config::Config;
use tower_cookies::Key;

use crate::usecase::callback::CallbackUseCase;
use crate::usecase::login::LoginUseCase;

#[derive(Clone)]
pub struct AuthState {
    pub cookie_key: Key,
    pub config: Arc<Config>,
    pub callback: Arc<dyn CallbackUseCase>,
    pub login: Arc<dyn LoginUseCase>,
}

impl AuthState {
    pub fn new(
        cookie_key: Key,
        config: Arc<Config>,
        callback: Arc<dyn CallbackUseCase>,
        login: Arc<dyn LoginUseCase>,
    ) -> Self {
        Self { cookie_key, config, callback, login }
    }
}
