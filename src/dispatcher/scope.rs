use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use super::core::HeaderVec;

/// Shared key/value state of one request
pub type ScopeState = Arc<RwLock<Map<String, Value>>>;

/// How a mounted application sees the parent's request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeMode {
    /// The mount shares the parent's state handle; its writes are visible to the parent
    #[default]
    PassThrough,
    /// The mount gets a snapshot; its writes never reach the parent
    Copy,
}

impl FromStr for ScopeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" | "pass_through" | "shared" => Ok(ScopeMode::PassThrough),
            "copy" | "isolated" => Ok(ScopeMode::Copy),
            other => Err(format!(
                "unknown scope mode '{other}', expected 'pass-through' or 'copy'"
            )),
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeMode::PassThrough => "pass-through",
            ScopeMode::Copy => "copy",
        })
    }
}

/// Request data the transport hands to the dispatcher.
///
/// The scope is transport-agnostic: query pairs, headers and cookies as already parsed
/// strings, the raw body, and the shared request state.
///
/// ```rust
/// use strata_router::dispatcher::RequestScope;
///
/// let scope = RequestScope::new()
///     .with_query("limit", "10")
///     .with_header("X-Request-Id", "abc");
/// assert_eq!(scope.get_query("limit"), Some("10"));
/// assert_eq!(scope.get_header("x-request-id"), Some("abc"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    pub query: HeaderVec,
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    pub body: Option<Vec<u8>>,
    pub state: ScopeState,
}

impl RequestScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Use an existing state handle
    #[must_use]
    pub fn with_state(mut self, state: ScopeState) -> Self {
        self.state = state;
        self
    }

    /// Query parameter, last occurrence wins
    #[must_use]
    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header by case-insensitive name
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body length in bytes, zero without a body
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }

    /// Body parsed as JSON
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    /// Read a state value
    #[must_use]
    pub fn state_get(&self, key: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Write a state value, returning the previous one
    pub fn state_insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    /// Scope handed to a mounted application.
    ///
    /// Carries nothing about the mount itself; the consumed prefix is only recorded by the
    /// parent on the returned invocation.
    #[must_use]
    pub fn for_mount(&self, mode: ScopeMode) -> Self {
        let state = match mode {
            ScopeMode::PassThrough => Arc::clone(&self.state),
            ScopeMode::Copy => {
                let snapshot = self
                    .state
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                Arc::new(RwLock::new(snapshot))
            }
        };
        Self {
            query: self.query.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
            body: self.body.clone(),
            state,
        }
    }
}
