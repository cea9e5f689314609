//! State machine of the post-authentication callback.
//!
//! ```text
//! Start -> [CodeExchange] -> SessionCheck -> ProfileCheck -> DashboardRedirect
//!                                                        \-> Reconcile -> RegisterRedirect
//! any failing step -> LoginFailureRedirect
//! ```
//!
//! [`transition`] is pure: collaborators are called by the usecase, which
//! feeds their outcome back in as a [`FlowEvent`].

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::redirect::CallbackRedirect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    CodeExchange,
    SessionCheck,
    ProfileCheck,
    Reconcile,
    DashboardRedirect,
    RegisterRedirect,
    LoginFailureRedirect,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        self.redirect().is_some()
    }

    pub fn redirect(self) -> Option<CallbackRedirect> {
        match self {
            FlowState::DashboardRedirect => Some(CallbackRedirect::Dashboard),
            FlowState::RegisterRedirect => Some(CallbackRedirect::Register),
            FlowState::LoginFailureRedirect => Some(CallbackRedirect::Login),
            _ => None,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Start => "start",
            FlowState::CodeExchange => "code_exchange",
            FlowState::SessionCheck => "session_check",
            FlowState::ProfileCheck => "profile_check",
            FlowState::Reconcile => "reconcile",
            FlowState::DashboardRedirect => "dashboard_redirect",
            FlowState::RegisterRedirect => "register_redirect",
            FlowState::LoginFailureRedirect => "login_failure_redirect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    UrlParsed { has_code: bool },
    /// The provider redirected back with an `error` parameter instead of a code.
    ProviderError,
    ExchangeSucceeded,
    ExchangeRejected,
    IdentityResolved,
    NoIdentity,
    ProfileFound,
    ProfileMissing,
    ProfileLookupFailed,
    CleanupFinished { identity_deleted: bool },
}

/// How reconciliation reacts to a failed identity deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    /// Send the user to login instead of registration while the orphaned
    /// identity still exists.
    pub block_on_deletion_failure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: FlowState,
    /// Set exactly when `state` is terminal.
    pub redirect: Option<CallbackRedirect>,
}

impl From<FlowState> for Transition {
    fn from(state: FlowState) -> Self {
        Self { state, redirect: state.redirect() }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("event {event:?} is not valid in state {state}")]
pub struct InvalidTransition {
    pub state: FlowState,
    pub event: FlowEvent,
}

pub fn transition(state: FlowState, event: FlowEvent, policy: ReconcilePolicy) -> Result<Transition, InvalidTransition> {
    use FlowEvent as E;
    use FlowState as S;

    let next = match (state, event) {
        (S::Start, E::UrlParsed { has_code: true }) => S::CodeExchange,
        (S::Start, E::UrlParsed { has_code: false }) => S::SessionCheck,
        (S::Start, E::ProviderError) => S::LoginFailureRedirect,

        (S::CodeExchange, E::ExchangeSucceeded) => S::SessionCheck,
        (S::CodeExchange, E::ExchangeRejected) => S::LoginFailureRedirect,

        (S::SessionCheck, E::IdentityResolved) => S::ProfileCheck,
        (S::SessionCheck, E::NoIdentity) => S::LoginFailureRedirect,

        (S::ProfileCheck, E::ProfileFound) => S::DashboardRedirect,
        (S::ProfileCheck, E::ProfileMissing) => S::Reconcile,
        (S::ProfileCheck, E::ProfileLookupFailed) => S::LoginFailureRedirect,

        (S::Reconcile, E::CleanupFinished { identity_deleted }) => {
            if !identity_deleted && policy.block_on_deletion_failure {
                S::LoginFailureRedirect
            } else {
                S::RegisterRedirect
            }
        },

        _ => return Err(InvalidTransition { state, event }),
    };

    Ok(next.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LENIENT: ReconcilePolicy = ReconcilePolicy { block_on_deletion_failure: false };
    const STRICT: ReconcilePolicy = ReconcilePolicy { block_on_deletion_failure: true };

    fn run(events: &[FlowEvent], policy: ReconcilePolicy) -> Vec<Transition> {
        let mut state = FlowState::Start;
        events
            .iter()
            .map(|event| {
                let next = transition(state, *event, policy).expect("valid transition");
                state = next.state;
                next
            })
            .collect()
    }

    #[test]
    fn test_happy_path_with_code() {
        let steps = run(
            &[
                FlowEvent::UrlParsed { has_code: true },
                FlowEvent::ExchangeSucceeded,
                FlowEvent::IdentityResolved,
                FlowEvent::ProfileFound,
            ],
            LENIENT,
        );

        let states: Vec<_> = steps.iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![FlowState::CodeExchange, FlowState::SessionCheck, FlowState::ProfileCheck, FlowState::DashboardRedirect]
        );
        assert_eq!(steps.last().unwrap().redirect, Some(CallbackRedirect::Dashboard));
        assert!(steps[..3].iter().all(|t| t.redirect.is_none()));
    }

    #[test]
    fn test_no_code_skips_exchange() {
        let next = transition(FlowState::Start, FlowEvent::UrlParsed { has_code: false }, LENIENT).unwrap();

        assert_eq!(next.state, FlowState::SessionCheck);
    }

    #[test]
    fn test_failures_redirect_to_login() {
        let cases = [
            (FlowState::Start, FlowEvent::ProviderError),
            (FlowState::CodeExchange, FlowEvent::ExchangeRejected),
            (FlowState::SessionCheck, FlowEvent::NoIdentity),
            (FlowState::ProfileCheck, FlowEvent::ProfileLookupFailed),
        ];

        for (state, event) in cases {
            let next = transition(state, event, LENIENT).unwrap();
            assert_eq!(next.state, FlowState::LoginFailureRedirect, "{state} + {event:?}");
            assert_eq!(next.redirect, Some(CallbackRedirect::Login));
        }
    }

    #[test]
    fn test_missing_profile_reconciles_then_registers() {
        let steps = run(
            &[
                FlowEvent::UrlParsed { has_code: false },
                FlowEvent::IdentityResolved,
                FlowEvent::ProfileMissing,
                FlowEvent::CleanupFinished { identity_deleted: true },
            ],
            LENIENT,
        );

        assert_eq!(steps[2].state, FlowState::Reconcile);
        assert_eq!(steps[3].redirect, Some(CallbackRedirect::Register));
    }

    #[test]
    fn test_deletion_failure_policy() {
        let failed = FlowEvent::CleanupFinished { identity_deleted: false };

        assert_eq!(transition(FlowState::Reconcile, failed, LENIENT).unwrap().state, FlowState::RegisterRedirect);
        assert_eq!(transition(FlowState::Reconcile, failed, STRICT).unwrap().state, FlowState::LoginFailureRedirect);

        let deleted = FlowEvent::CleanupFinished { identity_deleted: true };
        assert_eq!(transition(FlowState::Reconcile, deleted, STRICT).unwrap().state, FlowState::RegisterRedirect);
    }

    #[test]
    fn test_out_of_order_events_are_rejected() {
        let err = transition(FlowState::Start, FlowEvent::ProfileFound, LENIENT).unwrap_err();
        assert_eq!(err, InvalidTransition { state: FlowState::Start, event: FlowEvent::ProfileFound });

        // Reconcile only follows a missing profile.
        assert!(transition(FlowState::SessionCheck, FlowEvent::CleanupFinished { identity_deleted: true }, LENIENT).is_err());
        assert!(transition(FlowState::CodeExchange, FlowEvent::IdentityResolved, LENIENT).is_err());
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let terminals = [FlowState::DashboardRedirect, FlowState::RegisterRedirect, FlowState::LoginFailureRedirect];

        for state in terminals {
            assert!(state.is_terminal());
            assert!(transition(state, FlowEvent::UrlParsed { has_code: true }, LENIENT).is_err());
            assert!(transition(state, FlowEvent::NoIdentity, LENIENT).is_err());
        }
        assert!(!FlowState::Reconcile.is_terminal());
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: ReconcilePolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, ReconcilePolicy::default());

        let policy: ReconcilePolicy = serde_json::from_str(r#"{"block_on_deletion_failure":true}"#).unwrap();
        assert!(policy.block_on_deletion_failure);
    }
}
