use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::coerce::ParamConstraints;
use crate::dispatcher::HandlerInvocation;
use crate::path::ParamType;

/// Factory function of a [`Provider`]
pub type ProviderFn = Arc<dyn Fn(&HandlerInvocation) -> Value + Send + Sync>;

/// A named dependency: a factory evaluated per request plus the names it consumes.
///
/// Consumed names are checked at build time exactly like handler-consumed names: each must be
/// satisfied by a path parameter, a layered parameter, another dependency or a reserved name.
#[derive(Clone)]
pub struct Provider {
    factory: ProviderFn,
    consumes: Vec<String>,
}

impl Provider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> Value + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            consumes: Vec::new(),
        }
    }

    /// Provider returning a fixed value
    pub fn value(value: Value) -> Self {
        Self::new(move |_| value.clone())
    }

    /// Declare the names the factory reads from the invocation
    #[must_use]
    pub fn consumes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn consumed(&self) -> &[String] {
        &self.consumes
    }

    /// Evaluate the factory for one request
    pub fn provide(&self, invocation: &HandlerInvocation) -> Value {
        (self.factory)(invocation)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

/// Where a layered parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        })
    }
}

/// A parameter declared on a layer.
///
/// Query, header and cookie parameters are read from the request scope on demand with
/// [`HandlerInvocation::parameter`]. Path-located specs only carry constraints for a
/// parameter the endpoint template already declares; its type comes from the template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub location: ParameterLocation,
    /// Key looked up in the request, when it differs from the parameter name
    pub alias: Option<String>,
    pub kind: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub constraints: ParamConstraints,
}

impl ParameterSpec {
    fn located(location: ParameterLocation, kind: ParamType) -> Self {
        Self {
            location,
            alias: None,
            kind,
            required: false,
            default: None,
            constraints: ParamConstraints::default(),
        }
    }

    /// Constraints for a path parameter of the endpoint template
    #[must_use]
    pub fn path(constraints: ParamConstraints) -> Self {
        Self {
            constraints,
            ..Self::located(ParameterLocation::Path, ParamType::Str)
        }
    }

    #[must_use]
    pub fn query(kind: ParamType) -> Self {
        Self::located(ParameterLocation::Query, kind)
    }

    #[must_use]
    pub fn header(kind: ParamType) -> Self {
        Self::located(ParameterLocation::Header, kind)
    }

    #[must_use]
    pub fn cookie(kind: ParamType) -> Self {
        Self::located(ParameterLocation::Cookie, kind)
    }

    #[must_use]
    pub fn alias(mut self, key: impl Into<String>) -> Self {
        self.alias = Some(key.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn constraints(mut self, constraints: ParamConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Key to look up in the request for parameter `name`
    #[must_use]
    pub fn key<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(name)
    }
}

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

/// A cookie set on every response of the layer's endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub key: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Cookie {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    #[must_use]
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// `Set-Cookie` header value
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.key, self.value, self.path);
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out.push_str(match self.same_site {
            SameSite::Lax => "; SameSite=Lax",
            SameSite::Strict => "; SameSite=Strict",
            SameSite::None => "; SameSite=None",
        });
        out
    }
}

/// `Cache-Control` response header directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub stale_while_revalidate: Option<u64>,
    pub no_cache: bool,
    pub no_store: bool,
    pub private: bool,
    pub public: bool,
    pub must_revalidate: bool,
    pub immutable: bool,
}

impl CacheControl {
    /// `no-store`
    #[must_use]
    pub fn prevent_storing() -> Self {
        Self {
            no_store: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_age(seconds: u64) -> Self {
        Self {
            max_age: Some(seconds),
            ..Self::default()
        }
    }

    /// Header value, directives in a fixed order
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut directives: Vec<String> = Vec::new();
        let flags = [
            (self.public, "public"),
            (self.private, "private"),
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.must_revalidate, "must-revalidate"),
            (self.immutable, "immutable"),
        ];
        directives.extend(flags.iter().filter(|(on, _)| *on).map(|(_, d)| d.to_string()));
        if let Some(v) = self.max_age {
            directives.push(format!("max-age={v}"));
        }
        if let Some(v) = self.s_maxage {
            directives.push(format!("s-maxage={v}"));
        }
        if let Some(v) = self.stale_while_revalidate {
            directives.push(format!("stale-while-revalidate={v}"));
        }
        directives.join(", ")
    }
}
