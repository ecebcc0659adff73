use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error};

use super::component::{Component, ControllerSpec, HandlerSpec, MountSpec, RouterSpec};
use crate::error::BuildError;
use crate::layer::{Layer, Owner, OwnerKind, OwnershipChain, ResolvedConfig};
use crate::path::PathTemplate;
use crate::router::{Endpoint, MountPoint, RouteTree};

/// Names every handler can consume without declaring them on a layer
pub const RESERVED_NAMES: &[&str] = &[
    "request", "scope", "state", "headers", "query", "cookies", "body",
];

/// Endpoints registered under each handler name
pub type HandlerNames = HashMap<String, Vec<Arc<Endpoint>>>;

/// Builds the route tree from declared components.
///
/// Each handler path yields one [`Endpoint`]: its ownership chain is materialised, merged
/// once into a [`ResolvedConfig`], checked for unsatisfied consumed names, and inserted into
/// the tree. Any problem aborts the build with a [`BuildError`].
#[derive(Default)]
pub struct Registrar {
    tree: RouteTree,
    names: HandlerNames,
}

impl Registrar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component below `chain`, returning the endpoints it produced.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]; the registrar must be discarded afterwards.
    pub fn register(
        &mut self,
        component: &Component,
        chain: &OwnershipChain,
    ) -> Result<Vec<Arc<Endpoint>>, BuildError> {
        let mut endpoints = Vec::new();
        let result = match component {
            Component::Router(router) => self.register_router(router, chain, &mut endpoints),
            Component::Controller(controller) => {
                self.register_controller(controller, chain, &mut endpoints)
            }
            Component::Handler(handler) => self.register_handler(handler, chain, &mut endpoints),
            Component::Mount(mount) => self.register_mount(mount, chain),
        };

        if let Err(err) = &result {
            error!(error = %err, "Route registration failed");
        }
        result.map(|()| endpoints)
    }

    /// Hand over the built tree and the name index
    #[must_use]
    pub fn finish(self) -> (RouteTree, HandlerNames) {
        (self.tree, self.names)
    }

    fn register_router(
        &mut self,
        router: &RouterSpec,
        chain: &OwnershipChain,
        out: &mut Vec<Arc<Endpoint>>,
    ) -> Result<(), BuildError> {
        let chain = chain.child(
            Owner::new(OwnerKind::Router, &router.path),
            router.layer.clone(),
            PathTemplate::parse(&router.path)?,
        );
        for child in &router.children {
            out.extend(self.register(child, &chain)?);
        }
        Ok(())
    }

    fn register_controller(
        &mut self,
        controller: &ControllerSpec,
        chain: &OwnershipChain,
        out: &mut Vec<Arc<Endpoint>>,
    ) -> Result<(), BuildError> {
        let chain = chain.child(
            Owner::new(OwnerKind::Controller, &controller.name),
            controller.layer.clone(),
            PathTemplate::parse(&controller.path)?,
        );
        for handler in &controller.handlers {
            self.register_handler(handler, &chain, out)?;
        }
        Ok(())
    }

    fn register_handler(
        &mut self,
        spec: &HandlerSpec,
        chain: &OwnershipChain,
        out: &mut Vec<Arc<Endpoint>>,
    ) -> Result<(), BuildError> {
        for path in &spec.paths {
            let fragment = PathTemplate::parse(path)?;
            let owner_label = spec.name.clone().unwrap_or_else(|| fragment.to_string());
            let chain = chain.child(
                Owner::new(OwnerKind::Handler, &owner_label),
                spec.layer.clone(),
                fragment,
            );

            let mut template = chain.template()?;
            let config = chain.resolve()?;
            for (name, param_spec) in config.path_parameters() {
                template.constrain(name, &param_spec.constraints);
            }

            let label = spec.name.clone().unwrap_or_else(|| {
                let methods: Vec<&str> = spec.methods.iter().map(|m| m.as_str()).collect();
                format!("{} {}", methods.join(","), template)
            });
            let consumed = consumed_names(spec, &template, &config, &label)?;

            let endpoint = Arc::new(Endpoint {
                handler: Arc::clone(&spec.handler),
                methods: spec.methods.clone(),
                template,
                chain,
                config: Arc::new(config),
                name: spec.name.as_deref().map(Arc::from),
                label: Arc::from(label.as_str()),
                consumed,
            });

            if let Some(name) = &spec.name {
                self.claim_name(name, spec, &endpoint)?;
            }

            self.tree.insert(Arc::clone(&endpoint))?;
            debug!(
                handler_name = %endpoint.label(),
                path = %endpoint.template(),
                methods = ?endpoint.methods(),
                "Endpoint registered"
            );
            out.push(endpoint);
        }
        Ok(())
    }

    fn claim_name(
        &mut self,
        name: &str,
        spec: &HandlerSpec,
        endpoint: &Arc<Endpoint>,
    ) -> Result<(), BuildError> {
        let entry = self.names.entry(name.to_string()).or_default();
        if let Some(existing) = entry.first() {
            if !spec.same_handler(existing.handler()) {
                return Err(BuildError::DuplicateHandlerName {
                    name: name.to_string(),
                    existing_path: existing.template().to_string(),
                    incoming_path: endpoint.template().to_string(),
                });
            }
        }
        entry.push(Arc::clone(endpoint));
        Ok(())
    }

    fn register_mount(
        &mut self,
        spec: &MountSpec,
        chain: &OwnershipChain,
    ) -> Result<(), BuildError> {
        let fragment = PathTemplate::parse(&spec.path)?;
        if !fragment.is_static() {
            return Err(BuildError::InvalidMount {
                path: spec.path.clone(),
                reason: "mount paths cannot contain parameters".to_string(),
            });
        }

        let owner = Owner::new(OwnerKind::Mount, &fragment.to_string());
        let chain = chain.child(owner.clone(), Layer::empty(), fragment);
        let path = chain.template()?;
        if !path.is_static() {
            return Err(BuildError::InvalidMount {
                path: path.to_string(),
                reason: "mounts cannot be placed below a parameterised prefix".to_string(),
            });
        }

        let mount = Arc::new(MountPoint {
            path,
            app: Arc::clone(&spec.app),
            scope_mode: spec.scope_mode,
            methods: spec.methods.clone(),
            owner,
        });
        self.tree.insert_mount(Arc::clone(&mount))?;
        debug!(mount = %mount, "Mount registered");
        Ok(())
    }
}

/// Every name the handler consumes, directly or through the dependencies it uses.
///
/// Each must be a path parameter, a layered parameter, a dependency or a reserved name.
fn consumed_names(
    spec: &HandlerSpec,
    template: &PathTemplate,
    config: &ResolvedConfig,
    label: &str,
) -> Result<Vec<String>, BuildError> {
    let mut consumed: BTreeSet<String> = BTreeSet::new();
    let mut pending: Vec<String> = spec.consumes.clone();

    while let Some(name) = pending.pop() {
        if !consumed.insert(name.clone()) {
            continue;
        }

        if let Some(provider) = config.dependencies.get(&name) {
            pending.extend(provider.consumed().iter().cloned());
            continue;
        }

        let satisfied = template.parameter(&name).is_some()
            || config.parameters.contains_key(&name)
            || RESERVED_NAMES.contains(&name.as_str());
        if !satisfied {
            return Err(BuildError::UnsatisfiedParameter {
                name,
                handler: label.to_string(),
                path: template.to_string(),
            });
        }
    }

    Ok(consumed.into_iter().collect())
}
