//! # Registrar Module
//!
//! Declares application components ([`RouterSpec`], [`ControllerSpec`], [`HandlerSpec`],
//! [`MountSpec`]) and turns them into endpoints in a route tree.
//!
//! Registration happens once at startup. Every problem found while registering (bad path
//! syntax, ambiguous routes, redeclared path parameters, unsatisfied consumed names, duplicate
//! handler names, invalid mounts) is a [`BuildError`](crate::error::BuildError) that aborts
//! the build.

mod component;
mod core;

pub use component::{Component, ControllerSpec, HandlerSpec, MountSpec, RouterSpec};
pub use core::{HandlerNames, Registrar, RESERVED_NAMES};
