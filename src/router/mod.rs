//! # Router Module
//!
//! Path matching for strata-router. Endpoints and mount points are inserted into a typed
//! radix tree ([`RouteTree`]) at build time; the [`Router`] wrapper performs lookups and logs
//! their outcome.
//!
//! ## Overview
//!
//! - Static segments match exactly and are always tried first
//! - Typed parameters (`{id:int}`) match when the raw segment coerces to the type
//! - A greedy `{rest:path}` parameter matches one or more remaining segments
//! - A mount point receives whatever remains below its prefix
//! - Failed coercions and violated constraints backtrack to the next candidate
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//! use strata_router::router::Lookup;
//!
//! match app.router().route(&Method::GET, "/users/7") {
//!     Lookup::Matched { endpoint, params } => {
//!         assert_eq!(params[0].1.as_i64(), Some(7));
//!     }
//!     other => panic!("{other:?}"),
//! }
//! ```
//!
//! ## Performance
//!
//! Lookup cost grows with the number of request segments and with the amount of backtracking
//! between sibling parameter types, not with the number of registered routes.

mod core;
mod endpoint;
mod radix;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteInfo, Router, MAX_INLINE_PARAMS};
pub use endpoint::{Endpoint, MountPoint};
pub use radix::{Lookup, RouteTree};
