//! Request-scoped types exchanged between the host and the wizard.
//!
//! The wizard never touches the host's HTTP types directly. The host builds
//! a [`RequestContext`] per request and interprets the returned [`Dispatch`]
//! (issue a redirect, keep rendering, re-render with validation feedback).

use axum::http::Method;
use serde_json::{Map, Value};

/// Coarse HTTP method classification.
///
/// The wizard only cares whether a request can mutate progress; everything
/// that is not a write is a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Read,
    Write,
}

impl MethodKind {
    pub fn is_write(self) -> bool {
        self == Self::Write
    }
}

impl From<&Method> for MethodKind {
    fn from(method: &Method) -> Self {
        match *method {
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE => Self::Write,
            _ => Self::Read,
        }
    }
}

/// The inbound request as the wizard sees it: a path, a method class, and a
/// mutable data payload.
///
/// On the way in, `data` holds the submitted fields (form body, JSON body —
/// the host decides). The interceptor merges previously stored step data
/// underneath it, so after [`startup`](crate::WizardController::startup) the
/// payload also replays everything the user entered on earlier steps. Live
/// request fields win on conflict.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path: String,
    pub method: MethodKind,
    pub data: Map<String, Value>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, method: MethodKind) -> Self {
        Self {
            path: path.into(),
            method,
            data: Map::new(),
        }
    }

    /// Attach a submitted data payload.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// What the host should do after handing a request to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The URL is not part of the wizard; handle the request normally.
    Passthrough,
    /// The step is accessible and nothing was processed; render it.
    Continue,
    /// Send the client to this URL and stop handling the request.
    Redirect(String),
    /// A step handler vetoed the submission. Nothing was persisted and no
    /// redirect applies; re-render the form with validation feedback.
    Halted,
    /// The final step was just completed. The host decides what "finished"
    /// means (render a summary, hand off to an order pipeline, ...).
    Complete,
}

impl Dispatch {
    /// The redirect target, if this outcome is a redirect.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect(url) => Some(url),
            _ => None,
        }
    }
}
