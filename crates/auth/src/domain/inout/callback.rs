use app_core::identity::Session;

use crate::domain::error::{FlowError, ReconciliationWarning};
use crate::domain::flow::FlowState;
use crate::domain::redirect::CallbackRedirect;

// ╔════════════════════════════╗
// ║       Auth Callback        ║
// ╚════════════════════════════╝

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackInput {
    /// Request target the browser landed on, e.g. `/auth/callback?code=abc123`.
    pub uri: String,
    /// Session already held by the client, if any.
    pub session: Option<Session>,
    /// PKCE verifier stored when the social login started.
    pub code_verifier: Option<String>,
}

#[derive(Debug)]
pub struct CallbackOutput {
    pub redirect: CallbackRedirect,
    /// Session the client keeps. `None` means the client session is cleared.
    pub session: Option<Session>,
    /// Every state the run visited, `Start` first.
    pub trail: Vec<FlowState>,
    pub error: Option<FlowError>,
    pub warnings: Vec<ReconciliationWarning>,
}

/// Query parameters the identity provider appends to the callback URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Accepts an absolute URL or a bare request target. Empty values count as
    /// absent.
    pub fn from_uri(uri: &str) -> Self {
        let without_fragment = uri.split_once('#').map_or(uri, |(head, _)| head);
        let Some((_, query)) = without_fragment.split_once('?') else {
            return Self::default();
        };

        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            slot.get_or_insert_with(|| value.into_owned());
        }

        params
    }
}
