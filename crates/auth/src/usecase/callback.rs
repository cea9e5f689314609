use std::sync::Arc;

use app_core::config::Config;
use app_core::identity::{Identity, IdentityProvider, Session};
use async_trait::async_trait;

use crate::domain::error::{FlowError, ReconciliationWarning};
use crate::domain::flow::{FlowEvent, FlowState, ReconcilePolicy, transition};
use crate::domain::inout::prelude::*;
use crate::domain::redirect::CallbackRedirect;
use crate::outbound::repository::ProfileRepository;

const POLICY_KEY: &str = "auth.reconcile";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait CallbackUseCase: Send + Sync {
    /// Runs one post-authentication callback to its redirect. Never fails:
    /// every error ends in the login-failure redirect.
    async fn handle_callback(&self, input: CallbackInput) -> CallbackOutput;
}

#[derive(Clone)]
pub struct CallbackService {
    config: Arc<Config>,
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
}

/// Mutable data carried between the steps of one run.
struct FlowContext {
    uri: String,
    code: Option<String>,
    code_verifier: Option<String>,
    session: Option<Session>,
    identity: Option<Identity>,
    error: Option<FlowError>,
    warnings: Vec<ReconciliationWarning>,
}

impl FlowContext {
    fn new(input: CallbackInput) -> Self {
        Self {
            uri: input.uri,
            code: None,
            code_verifier: input.code_verifier,
            session: input.session,
            identity: None,
            error: None,
            warnings: Vec::new(),
        }
    }
}

impl CallbackService {
    pub fn new(config: Arc<Config>, identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { config, identity, profiles }
    }

    /// Read per run so a config reload applies to the next callback.
    fn policy(&self) -> ReconcilePolicy {
        self.config.get_or(POLICY_KEY, ReconcilePolicy::default()).unwrap_or_else(|e| {
            tracing::warn!("Invalid reconcile policy, using default: {:?}", e);
            ReconcilePolicy::default()
        })
    }

    /// Performs the side effect owned by `state` and reports its outcome.
    /// Terminal states own no side effect.
    async fn step(&self, state: FlowState, ctx: &mut FlowContext) -> Option<FlowEvent> {
        let event = match state {
            FlowState::Start => self.parse_url(ctx),
            FlowState::CodeExchange => self.exchange_code(ctx).await,
            FlowState::SessionCheck => self.check_session(ctx).await,
            FlowState::ProfileCheck => self.check_profile(ctx).await,
            FlowState::Reconcile => self.reconcile(ctx).await,
            terminal => {
                debug_assert!(terminal.is_terminal());
                return None;
            },
        };

        Some(event)
    }

    fn parse_url(&self, ctx: &mut FlowContext) -> FlowEvent {
        let params = CallbackParams::from_uri(&ctx.uri);

        if let Some(error) = params.error {
            let reason = params.error_description.map_or(error.clone(), |desc| format!("{error}: {desc}"));
            ctx.error = Some(FlowError::AuthExchange(reason));
            return FlowEvent::ProviderError;
        }

        ctx.code = params.code;
        FlowEvent::UrlParsed { has_code: ctx.code.is_some() }
    }

    async fn exchange_code(&self, ctx: &mut FlowContext) -> FlowEvent {
        let Some(code) = ctx.code.take() else {
            return FlowEvent::ExchangeRejected;
        };

        match self.identity.exchange_code(&code, ctx.code_verifier.take()).await {
            Ok(session) => {
                ctx.session = Some(session);
                FlowEvent::ExchangeSucceeded
            },
            Err(e) => {
                tracing::warn!("Authorization code exchange failed: {:?}", e);
                ctx.error = Some(FlowError::AuthExchange(e.to_string()));
                FlowEvent::ExchangeRejected
            },
        }
    }

    async fn check_session(&self, ctx: &mut FlowContext) -> FlowEvent {
        let Some(session) = ctx.session.as_ref() else {
            ctx.error = Some(FlowError::NoSession);
            return FlowEvent::NoIdentity;
        };

        match self.identity.get_identity(session).await {
            Ok(Some(identity)) => {
                ctx.identity = Some(identity);
                FlowEvent::IdentityResolved
            },
            Ok(None) => {
                ctx.error = Some(FlowError::NoSession);
                FlowEvent::NoIdentity
            },
            Err(e) => {
                tracing::error!("Failed to resolve current identity: {:?}", e);
                ctx.error = Some(FlowError::NoSession);
                FlowEvent::NoIdentity
            },
        }
    }

    async fn check_profile(&self, ctx: &mut FlowContext) -> FlowEvent {
        let Some(identity) = ctx.identity.as_ref() else {
            ctx.error = Some(FlowError::NoSession);
            return FlowEvent::NoIdentity;
        };

        match self.profiles.find_profile_by_id(&identity.id).await {
            Ok(Some(_)) => FlowEvent::ProfileFound,
            Ok(None) => {
                tracing::info!(identity_id = %identity.id, "Identity has no profile, reconciling");
                FlowEvent::ProfileMissing
            },
            Err(e) => {
                tracing::error!(identity_id = %identity.id, "Profile lookup failed: {:?}", e);
                ctx.error = Some(FlowError::ProfileLookup(e));
                FlowEvent::ProfileLookupFailed
            },
        }
    }

    /// Deletes the orphaned identity, then clears the session. Both steps run
    /// regardless of the other's outcome.
    async fn reconcile(&self, ctx: &mut FlowContext) -> FlowEvent {
        let Some(identity_id) = ctx.identity.as_ref().map(|i| i.id.clone()) else {
            ctx.session = None;
            return FlowEvent::CleanupFinished { identity_deleted: false };
        };

        let identity_deleted = match self.identity.delete_identity(&identity_id).await {
            Ok(()) => true,
            Err(source) => {
                let warning = ReconciliationWarning::DeleteIdentity { identity_id: identity_id.clone(), source };
                tracing::warn!(identity_id = %identity_id, error = ?warning, "Reconciliation cleanup failed");
                ctx.warnings.push(warning);
                false
            },
        };

        if let Some(session) = ctx.session.take() {
            if let Err(source) = self.identity.sign_out(&session).await {
                let warning = ReconciliationWarning::ClearSession { identity_id: identity_id.clone(), source };
                tracing::warn!(identity_id = %identity_id, error = ?warning, "Reconciliation cleanup failed");
                ctx.warnings.push(warning);
            }
        }

        FlowEvent::CleanupFinished { identity_deleted }
    }
}

#[async_trait]
impl CallbackUseCase for CallbackService {
    async fn handle_callback(&self, input: CallbackInput) -> CallbackOutput {
        let policy = self.policy();
        let mut ctx = FlowContext::new(input);
        let mut state = FlowState::Start;
        let mut trail = vec![state];

        let redirect = loop {
            let Some(event) = self.step(state, &mut ctx).await else {
                break state.redirect().unwrap_or(CallbackRedirect::Login);
            };

            match transition(state, event, policy) {
                Ok(next) => {
                    tracing::debug!(from = %state, to = %next.state, event = ?event, "Callback flow transition");
                    state = next.state;
                    trail.push(state);
                    if let Some(redirect) = next.redirect {
                        break redirect;
                    }
                },
                Err(e) => {
                    tracing::error!("Callback flow aborted: {}", e);
                    trail.push(FlowState::LoginFailureRedirect);
                    break CallbackRedirect::Login;
                },
            }
        };

        match &ctx.error {
            Some(err @ FlowError::ProfileLookup(_)) => tracing::error!("Callback failed: {}", err),
            Some(err) => tracing::warn!("Callback failed: {}", err),
            None => tracing::info!(redirect = %redirect.path(), "Callback completed"),
        }

        // Only a dashboard redirect keeps a session on the client.
        let session = match redirect {
            CallbackRedirect::Dashboard => ctx.session,
            CallbackRedirect::Register | CallbackRedirect::Login => None,
        };

        CallbackOutput { redirect, session, trail, error: ctx.error, warnings: ctx.warnings }
    }
}
