use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGIN_PATH: &str = "/auth/login";

/// Value of the `error` query parameter attached to non-dashboard redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    NotRegistered,
    AuthFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown reason code: {0}")]
pub struct UnknownReasonCode(pub String);

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::NotRegistered => "not_registered",
            ReasonCode::AuthFailed => "auth_failed",
        }
    }

    /// Message shown by the login and registration pages.
    pub fn message(self) -> &'static str {
        match self {
            ReasonCode::NotRegistered => "You are not registered. Please sign up first.",
            ReasonCode::AuthFailed => "Authentication failed. Please try signing in again.",
        }
    }
}

impl FromStr for ReasonCode {
    type Err = UnknownReasonCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_registered" => Ok(ReasonCode::NotRegistered),
            "auth_failed" => Ok(ReasonCode::AuthFailed),
            other => Err(UnknownReasonCode(other.to_string())),
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three destinations a callback can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRedirect {
    Dashboard,
    Register,
    Login,
}

impl CallbackRedirect {
    pub fn reason(self) -> Option<ReasonCode> {
        match self {
            CallbackRedirect::Dashboard => None,
            CallbackRedirect::Register => Some(ReasonCode::NotRegistered),
            CallbackRedirect::Login => Some(ReasonCode::AuthFailed),
        }
    }

    pub fn path(self) -> String {
        let base = match self {
            CallbackRedirect::Dashboard => DASHBOARD_PATH,
            CallbackRedirect::Register => REGISTER_PATH,
            CallbackRedirect::Login => LOGIN_PATH,
        };

        match self.reason() {
            Some(reason) => format!("{base}?error={reason}"),
            None => base.to_string(),
        }
    }

    /// Absolute location when `base_url` is set, otherwise the bare path.
    pub fn location(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}
