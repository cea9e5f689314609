mod domain;
mod inbound;
mod outbound;
mod usecase;

use std::sync::Arc;

use app_core::config::Config;
use app_core::identity::IdentityProvider;
pub use inbound::router::create_router;
pub use inbound::state::AuthState;
use sea_orm::DatabaseConnection;
use tower_cookies::Key;

use crate::outbound::orm::ProfileORM;
use crate::usecase::callback::CallbackService;
use crate::usecase::login::LoginService;

pub struct Dependency {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cookie_key: Key,
}

pub fn new(dep: Dependency) -> AuthState {
    let profiles = Arc::new(ProfileORM::new(dep.db));

    let callback_svc = Arc::new(CallbackService::new(dep.config.clone(), dep.identity.clone(), profiles));
    let login_svc = Arc::new(LoginService::new(dep.config.clone(), dep.identity));

    AuthState::new(dep.cookie_key, dep.config, callback_svc, login_svc)
}
