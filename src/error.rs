//! Build-time and request-time errors.
//!
//! Build errors abort application startup. They are produced while templates are parsed,
//! ownership chains are merged and endpoints are inserted into the route tree, and they always
//! name the paths and owners involved so the offending declaration can be found.
//!
//! Request errors are limited to the two outcomes a client can observe from routing:
//! no match (404) and a path that exists without the requested method (405). Parameter
//! coercion failures never surface here; they make the tree backtrack instead.

use http::{Method, StatusCode};
use std::fmt;

use crate::layer::ParameterLocation;

/// A path string could not be parsed into a [`PathTemplate`](crate::path::PathTemplate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSyntaxError {
    /// The (normalized) path being parsed
    pub path: String,
    /// The segment that failed to parse
    pub segment: String,
    /// Human readable reason
    pub reason: String,
}

impl PathSyntaxError {
    pub(crate) fn new(path: &str, segment: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PathSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid path segment '{}' in '{}': {}",
            self.segment, self.path, self.reason
        )
    }
}

impl std::error::Error for PathSyntaxError {}

/// Two endpoints claim the same method on the same resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousRouteError {
    /// Conflicting method (`None` when two mounts collide)
    pub method: Option<Method>,
    /// Canonical path of the new registration
    pub path: String,
    /// Description of the registration already present
    pub existing: String,
    /// Description of the registration being added
    pub incoming: String,
}

impl fmt::Display for AmbiguousRouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(
                f,
                "ambiguous route: {} {} is registered by {} and again by {}",
                method, self.path, self.existing, self.incoming
            ),
            None => write!(
                f,
                "ambiguous route: mount at {} is registered by {} and again by {}",
                self.path, self.existing, self.incoming
            ),
        }
    }
}

impl std::error::Error for AmbiguousRouteError {}

/// Fatal error raised while building an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Invalid path template syntax
    PathSyntax(PathSyntaxError),
    /// Duplicate registration of a method on one path
    AmbiguousRoute(AmbiguousRouteError),
    /// A path parameter is declared by more than one layer of an ownership chain
    PathParameterRedeclared {
        /// Parameter name
        name: String,
        /// Owner that declared it first (closest to the root)
        first: String,
        /// Owner that declared it again
        second: String,
    },
    /// A path-located parameter spec names a parameter missing from the endpoint path
    UnknownPathParameter {
        /// Parameter name
        name: String,
        /// Canonical endpoint path
        path: String,
        /// Owner declaring the parameter
        owner: String,
    },
    /// A handler or provider consumes a name nothing in its chain provides
    UnsatisfiedParameter {
        /// Consumed name
        name: String,
        /// Handler whose chain was checked
        handler: String,
        /// Canonical endpoint path
        path: String,
    },
    /// Two different handlers share a name
    DuplicateHandlerName {
        /// The contested name
        name: String,
        /// Path of the handler that registered the name first
        existing_path: String,
        /// Path of the handler trying to reuse it
        incoming_path: String,
    },
    /// A mount declaration cannot be registered
    InvalidMount {
        /// Mount path as declared
        path: String,
        /// Reason
        reason: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::PathSyntax(err) => write!(f, "{err}"),
            BuildError::AmbiguousRoute(err) => write!(f, "{err}"),
            BuildError::PathParameterRedeclared {
                name,
                first,
                second,
            } => write!(
                f,
                "path parameter '{}' is declared by {} and redeclared by {}; \
                path parameters cannot vary between layers",
                name, first, second
            ),
            BuildError::UnknownPathParameter { name, path, owner } => write!(
                f,
                "{} declares path parameter '{}' but '{}' has no such parameter",
                owner, name, path
            ),
            BuildError::UnsatisfiedParameter {
                name,
                handler,
                path,
            } => write!(
                f,
                "handler {} at '{}' consumes '{}' which is neither a path parameter, \
                a layered parameter nor a dependency",
                handler, path, name
            ),
            BuildError::DuplicateHandlerName {
                name,
                existing_path,
                incoming_path,
            } => write!(
                f,
                "handler name '{}' is already used by the handler at '{}' (while registering '{}')",
                name, existing_path, incoming_path
            ),
            BuildError::InvalidMount { path, reason } => {
                write!(f, "invalid mount at '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::PathSyntax(err) => Some(err),
            BuildError::AmbiguousRoute(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathSyntaxError> for BuildError {
    fn from(err: PathSyntaxError) -> Self {
        BuildError::PathSyntax(err)
    }
}

impl From<AmbiguousRouteError> for BuildError {
    fn from(err: AmbiguousRouteError) -> Self {
        BuildError::AmbiguousRoute(err)
    }
}

/// Request-time routing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No route matches the path
    NotFound,
    /// The path exists but not for the requested method; carries the allowed methods
    MethodNotAllowed(Vec<Method>),
}

impl DispatchError {
    /// HTTP status this error is surfaced as
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Value of the `Allow` header for 405 responses
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            DispatchError::MethodNotAllowed(methods) => Some(
                methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            DispatchError::NotFound => None,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound => write!(f, "no route matches the request path"),
            DispatchError::MethodNotAllowed(methods) => write!(
                f,
                "method not allowed; allowed methods: {}",
                methods
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl std::error::Error for DispatchError {}

/// A layered query, header, cookie or path parameter could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// No layer of the endpoint declares the parameter
    Undeclared(String),
    /// A required parameter is absent from the request
    Missing {
        /// Parameter name
        name: String,
        /// Where it was looked up
        location: ParameterLocation,
    },
    /// The value does not coerce to the declared type or violates a constraint
    Invalid {
        /// Parameter name
        name: String,
        /// Where it was read from
        location: ParameterLocation,
        /// What was wrong with it
        reason: String,
    },
}

impl ParameterError {
    /// Undeclared parameters are a handler bug (500), the rest are client errors (400)
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParameterError::Undeclared(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ParameterError::Missing { .. } | ParameterError::Invalid { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Undeclared(name) => {
                write!(f, "parameter '{}' is not declared on any layer", name)
            }
            ParameterError::Missing { name, location } => {
                write!(f, "missing required {} parameter '{}'", location, name)
            }
            ParameterError::Invalid {
                name,
                location,
                reason,
            } => write!(f, "invalid {} parameter '{}': {}", location, name, reason),
        }
    }
}

impl std::error::Error for ParameterError {}

/// Reverse routing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseError {
    /// No handler registered under the name
    UnknownHandler(String),
    /// None of the handler's paths accepts the supplied parameters
    NoMatchingPath {
        /// Handler name
        name: String,
        /// Why the last candidate was rejected
        reason: String,
    },
}

impl fmt::Display for ReverseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReverseError::UnknownHandler(name) => write!(f, "route {} can not be found", name),
            ReverseError::NoMatchingPath { name, reason } => {
                write!(f, "no path of route {} matches the parameters: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ReverseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_header_lists_methods_in_order() {
        let err = DispatchError::MethodNotAllowed(vec![Method::GET, Method::POST]);
        assert_eq!(err.allow_header().as_deref(), Some("GET, POST"));
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(DispatchError::NotFound.allow_header(), None);
        assert_eq!(DispatchError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_build_error_messages_name_the_conflict() {
        let err = BuildError::PathParameterRedeclared {
            name: "id".into(),
            first: "router '/users/{id:int}'".into(),
            second: "handler 'get_user'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'id'"));
        assert!(msg.contains("router '/users/{id:int}'"));
        assert!(msg.contains("handler 'get_user'"));

        let err: BuildError = PathSyntaxError::new("/a/{x:foo}", "{x:foo}", "unknown type").into();
        assert!(err.to_string().contains("{x:foo}"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parameter_error_status() {
        let missing = ParameterError::Missing {
            name: "limit".into(),
            location: ParameterLocation::Query,
        };
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "missing required query parameter 'limit'");
        assert_eq!(
            ParameterError::Undeclared("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
