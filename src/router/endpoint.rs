use http::Method;
use std::fmt;
use std::sync::Arc;

use crate::app::Application;
use crate::dispatcher::{Handler, ScopeMode};
use crate::layer::{Owner, OwnershipChain, ResolvedConfig};
use crate::path::PathTemplate;

/// A handler registered at one full path.
///
/// Built once by the registrar and shared read-only by the route tree. A handler declared with
/// several paths, or registered under several parents, yields one endpoint per full path.
pub struct Endpoint {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) methods: Vec<Method>,
    pub(crate) template: PathTemplate,
    pub(crate) chain: OwnershipChain,
    pub(crate) config: Arc<ResolvedConfig>,
    pub(crate) name: Option<Arc<str>>,
    pub(crate) label: Arc<str>,
    pub(crate) consumed: Vec<String>,
}

impl Endpoint {
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Methods this endpoint answers, in declaration order
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Full path from the application root, with constraints attached
    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    #[must_use]
    pub fn chain(&self) -> &OwnershipChain {
        &self.chain
    }

    /// Merged layer configuration, resolved once at build time
    #[must_use]
    pub fn config(&self) -> &Arc<ResolvedConfig> {
        &self.config
    }

    /// Unique handler name, when one was given
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in logs: the handler name or its owner label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Names consumed by the handler and by its dependencies, sorted and unique
    #[must_use]
    pub fn consumed_parameters(&self) -> &[String] {
        &self.consumed
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("label", &self.label)
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("template", &self.template.to_string())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler '{}' at {}", self.label, self.template)
    }
}

/// An application mounted under a static prefix.
///
/// The mount receives every request below its prefix with the prefix stripped. It answers all
/// methods unless `methods` restricts them.
pub struct MountPoint {
    pub(crate) path: PathTemplate,
    pub(crate) app: Arc<Application>,
    pub(crate) scope_mode: Option<ScopeMode>,
    pub(crate) methods: Option<Vec<Method>>,
    pub(crate) owner: Owner,
}

impl MountPoint {
    /// Mount prefix from the application root
    #[must_use]
    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    #[must_use]
    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    /// Scope mode set on the mount itself; `None` defers to the router configuration
    #[must_use]
    pub fn scope_mode(&self) -> Option<ScopeMode> {
        self.scope_mode
    }

    #[must_use]
    pub fn accepts(&self, method: &Method) -> bool {
        self.methods
            .as_ref()
            .map_or(true, |methods| methods.contains(method))
    }
}

impl fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountPoint")
            .field("path", &self.path.to_string())
            .field("owner", &self.owner)
            .field("scope_mode", &self.scope_mode)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.owner, self.path)
    }
}
