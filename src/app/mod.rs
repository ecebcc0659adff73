//! # Application Module
//!
//! Ties the pieces together: an [`ApplicationBuilder`] collects the application layer, its
//! components and a [`RouterConfig`](crate::config::RouterConfig), and `build()` registers
//! everything into an immutable [`Application`].
//!
//! An application answers requests through its dispatcher, lists its routes, and resolves
//! handler names back into paths (`handler_index`, `route_reverse`). Applications can be
//! mounted inside other applications with [`MountSpec`](crate::registrar::MountSpec).
//!
//! [`LiveApplication`] wraps a snapshot that can be rebuilt with more components while it
//! is serving.

mod core;
mod live;
mod reverse;

pub use core::{Application, ApplicationBuilder, HandlerIndex};
pub use live::LiveApplication;
