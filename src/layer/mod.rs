//! # Layer Module
//!
//! Layered configuration. Every component of an application (the application itself,
//! routers, controllers, handlers) carries one [`Layer`]. At build time the layers on the way
//! from the root to a handler form an [`OwnershipChain`], which is merged once into a
//! [`ResolvedConfig`] and cached on the endpoint.
//!
//! ```rust
//! use strata_router::layer::{Layer, Owner, OwnerKind, OwnershipChain};
//! use strata_router::path::PathTemplate;
//!
//! let chain = OwnershipChain::new()
//!     .child(
//!         Owner::new(OwnerKind::Application, "app"),
//!         Layer::builder().tag("public").build(),
//!         PathTemplate::root(),
//!     )
//!     .child(
//!         Owner::new(OwnerKind::Handler, "health"),
//!         Layer::builder().tag("ops").build(),
//!         PathTemplate::parse("/health").unwrap(),
//!     );
//!
//! let config = chain.resolve().unwrap();
//! assert_eq!(config.tags, vec!["public", "ops"]);
//! ```

mod aspects;
mod core;
mod merge;

pub use aspects::{
    CacheControl, Cookie, ParameterLocation, ParameterSpec, Provider, ProviderFn, SameSite,
};
pub use core::{Layer, LayerBuilder};
pub use merge::{ChainLink, Owner, OwnerKind, OwnershipChain, ResolvedConfig};
