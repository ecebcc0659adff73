//! # Path Module
//!
//! Parses path strings into [`PathTemplate`]s: ordered static and typed parameter segments.
//!
//! ## Syntax
//!
//! ```text
//! /users/{user_id:uuid}/posts/{post_id:int}
//! /files/{rest:path}
//! /greet/{name}            <- bare parameters are `str`
//! ```
//!
//! Supported types: `str`, `path`, `int`, `float`, `decimal`, `uuid`, `date`, `time`,
//! `datetime`, `timedelta`. Anything else fails at build time with a
//! [`PathSyntaxError`](crate::error::PathSyntaxError).
//!
//! ## Example
//!
//! ```rust
//! use strata_router::path::{ParamType, PathTemplate};
//!
//! let template = PathTemplate::parse("/users/{id:int}").unwrap();
//! assert_eq!(template.parameter("id").unwrap().kind, ParamType::Int);
//! assert_eq!(template.to_string(), "/users/{id:int}");
//! ```

mod param_type;
mod template;

pub use param_type::ParamType;
pub use template::{PathParam, PathSegment, PathTemplate};

/// Normalize a path: single leading `/`, no repeated or trailing `/`.
///
/// The root path stays `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join path fragments and normalize the result.
#[must_use]
pub fn join_paths<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/");
    normalize_path(&joined)
}

/// Split a request path on `/`, dropping empty segments.
pub(crate) fn split_segments(path: &str) -> smallvec::SmallVec<[&str; 8]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
