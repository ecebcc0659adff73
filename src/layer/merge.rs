use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::aspects::{CacheControl, Cookie, ParameterLocation, ParameterSpec, Provider};
use super::Layer;
use crate::error::{BuildError, PathSyntaxError};
use crate::middleware::{AfterRequestHook, BeforeRequestHook, Guard, Middleware};
use crate::path::{join_paths, ParamType, PathSegment, PathTemplate};

/// Kind of component owning a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Application,
    Router,
    Controller,
    Handler,
    Mount,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OwnerKind::Application => "application",
            OwnerKind::Router => "router",
            OwnerKind::Controller => "controller",
            OwnerKind::Handler => "handler",
            OwnerKind::Mount => "mount",
        })
    }
}

/// The component a chain link came from, used in build error messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    pub kind: OwnerKind,
    pub label: Arc<str>,
}

impl Owner {
    #[must_use]
    pub fn new(kind: OwnerKind, label: &str) -> Self {
        Self {
            kind,
            label: Arc::from(label),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.label)
    }
}

/// One component on the way from the application root to a handler
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub owner: Owner,
    pub layer: Layer,
    /// Path fragment contributed by this component
    pub path: PathTemplate,
}

/// Ordered components from the application root to a handler.
///
/// Chains are values: extending one with [`OwnershipChain::child`] leaves the parent untouched,
/// so a component registered under two parents ends up with two independent chains.
#[derive(Debug, Clone, Default)]
pub struct OwnershipChain {
    links: Vec<ChainLink>,
}

impl OwnershipChain {
    /// Empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New chain extended with one more link
    #[must_use]
    pub fn child(&self, owner: Owner, layer: Layer, path: PathTemplate) -> Self {
        let mut links = self.links.clone();
        links.push(ChainLink { owner, layer, path });
        Self { links }
    }

    #[must_use]
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Owner of the innermost link
    #[must_use]
    pub fn leaf(&self) -> Option<&Owner> {
        self.links.last().map(|link| &link.owner)
    }

    /// Full path of the chain: every fragment joined root first.
    ///
    /// # Errors
    ///
    /// [`BuildError::PathParameterRedeclared`] when two fragments declare the same parameter,
    /// [`BuildError::PathSyntax`] when a fragment follows a greedy `path` parameter.
    pub fn template(&self) -> Result<PathTemplate, BuildError> {
        let mut template = PathTemplate::root();
        let mut declared_by: Vec<(Arc<str>, &Owner)> = Vec::new();

        for link in &self.links {
            if let Some(PathSegment::Parameter(greedy)) = template.segments().last() {
                if greedy.kind == ParamType::Path && !link.path.is_root() {
                    return Err(PathSyntaxError::new(
                        &join_paths(&[template.to_string(), link.path.to_string()]),
                        &format!("{{{}:path}}", greedy.name),
                        format!("a 'path' parameter must be the last segment ({})", link.owner),
                    )
                    .into());
                }
            }

            template = template.join(&link.path).map_err(|name| {
                let first = declared_by
                    .iter()
                    .find(|(declared, _)| *declared == name)
                    .map(|(_, owner)| owner.to_string())
                    .unwrap_or_default();
                BuildError::PathParameterRedeclared {
                    name: name.to_string(),
                    first,
                    second: link.owner.to_string(),
                }
            })?;

            for param in link.path.parameters() {
                declared_by.push((Arc::clone(&param.name), &link.owner));
            }
        }

        Ok(template)
    }

    /// Merge every layer of the chain into one configuration.
    ///
    /// Pure: the same chain always resolves to the same configuration, so the registrar
    /// runs it once per endpoint and caches the result.
    ///
    /// # Errors
    ///
    /// * [`BuildError::PathParameterRedeclared`] when a path parameter is declared twice,
    ///   in two path fragments or in two path-located parameter specs.
    /// * [`BuildError::UnknownPathParameter`] when a path-located spec names a parameter the
    ///   endpoint path does not declare.
    pub fn resolve(&self) -> Result<ResolvedConfig, BuildError> {
        let template = self.template()?;
        let mut config = ResolvedConfig::default();
        let mut path_spec_owner: BTreeMap<&str, &Owner> = BTreeMap::new();

        for link in &self.links {
            let layer = &link.layer;

            for (name, spec) in &layer.parameters {
                if spec.location == ParameterLocation::Path {
                    if template.parameter(name).is_none() {
                        return Err(BuildError::UnknownPathParameter {
                            name: name.clone(),
                            path: template.to_string(),
                            owner: link.owner.to_string(),
                        });
                    }
                    if let Some(first) = path_spec_owner.insert(name.as_str(), &link.owner) {
                        return Err(BuildError::PathParameterRedeclared {
                            name: name.clone(),
                            first: first.to_string(),
                            second: link.owner.to_string(),
                        });
                    }
                }
                config.parameters.insert(name.clone(), spec.clone());
            }

            config
                .middleware
                .extend(layer.middleware.iter().map(Arc::clone));
            config.guards.extend(layer.guards.iter().map(Arc::clone));
            for tag in &layer.tags {
                if !config.tags.contains(tag) {
                    config.tags.push(tag.clone());
                }
            }

            for (name, provider) in &layer.dependencies {
                config.dependencies.insert(name.clone(), provider.clone());
            }
            for (name, value) in &layer.response_headers {
                config
                    .response_headers
                    .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
                config.response_headers.push((name.clone(), value.clone()));
            }
            for (key, cookie) in &layer.response_cookies {
                config.response_cookies.insert(key.clone(), cookie.clone());
            }
            for (key, value) in &layer.opt {
                config.opt.insert(key.clone(), value.clone());
            }

            if let Some(v) = &layer.response_class {
                config.response_class = Some(Arc::clone(v));
            }
            if let Some(v) = &layer.media_type {
                config.media_type = Some(v.clone());
            }
            if let Some(v) = &layer.cache_control {
                config.cache_control = Some(v.clone());
            }
            if let Some(v) = layer.include_in_schema {
                config.include_in_schema = v;
            }
            if let Some(v) = layer.request_max_body_size {
                config.request_max_body_size = Some(v);
            }
            if let Some(v) = &layer.before_request {
                config.before_request = Some(Arc::clone(v));
            }
            if let Some(v) = &layer.after_request {
                config.after_request = Some(Arc::clone(v));
            }
        }

        Ok(config)
    }
}

/// The merged configuration of one endpoint.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub guards: Vec<Arc<dyn Guard>>,
    pub tags: Vec<String>,
    pub dependencies: BTreeMap<String, Provider>,
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub response_headers: Vec<(String, String)>,
    pub response_cookies: BTreeMap<String, Cookie>,
    pub opt: Map<String, Value>,
    pub response_class: Option<Arc<str>>,
    pub media_type: Option<String>,
    pub cache_control: Option<CacheControl>,
    pub include_in_schema: bool,
    pub request_max_body_size: Option<usize>,
    pub before_request: Option<BeforeRequestHook>,
    pub after_request: Option<AfterRequestHook>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            middleware: Vec::new(),
            guards: Vec::new(),
            tags: Vec::new(),
            dependencies: BTreeMap::new(),
            parameters: BTreeMap::new(),
            response_headers: Vec::new(),
            response_cookies: BTreeMap::new(),
            opt: Map::new(),
            response_class: None,
            media_type: None,
            cache_control: None,
            include_in_schema: true,
            request_max_body_size: None,
            before_request: None,
            after_request: None,
        }
    }
}

impl ResolvedConfig {
    /// Response header value by case-insensitive name
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path-located parameter specs, by parameter name
    pub fn path_parameters(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.location == ParameterLocation::Path)
            .map(|(name, spec)| (name.as_str(), spec))
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("middleware", &self.middleware.len())
            .field("guards", &self.guards.len())
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies.keys().collect::<Vec<_>>())
            .field("parameters", &self.parameters)
            .field("response_headers", &self.response_headers)
            .field("response_cookies", &self.response_cookies)
            .field("opt", &self.opt)
            .field("response_class", &self.response_class)
            .field("media_type", &self.media_type)
            .field("cache_control", &self.cache_control)
            .field("include_in_schema", &self.include_in_schema)
            .field("request_max_body_size", &self.request_max_body_size)
            .finish_non_exhaustive()
    }
}
