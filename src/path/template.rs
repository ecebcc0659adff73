use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{normalize_path, ParamType};
use crate::coerce::ParamConstraints;
use crate::error::PathSyntaxError;

static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("parameter name regex is valid")
});

/// A typed path parameter declared as `{name:type}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathParam {
    /// Parameter name
    pub name: Arc<str>,
    /// Declared type
    pub kind: ParamType,
    /// Value constraints, attached from path-located parameter specs at registration
    pub constraints: ParamConstraints,
}

/// One segment of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Literal text matched exactly
    Static(String),
    /// Typed parameter
    Parameter(PathParam),
}

impl PathSegment {
    /// The parameter, when this is a parameter segment
    #[must_use]
    pub fn as_param(&self) -> Option<&PathParam> {
        match self {
            PathSegment::Parameter(param) => Some(param),
            PathSegment::Static(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Static(text) => f.write_str(text),
            PathSegment::Parameter(param) => write!(f, "{{{}:{}}}", param.name, param.kind),
        }
    }
}

/// Parsed path such as `/users/{user_id:uuid}/posts`.
///
/// Parameter names are unique within a template and a `path` parameter can only be the last
/// segment. The `Display` form is canonical, so parsing it again yields an equal template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathTemplate {
    segments: Vec<PathSegment>,
}

impl PathTemplate {
    /// The root template `/`
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path string.
    ///
    /// # Errors
    ///
    /// Returns [`PathSyntaxError`] naming the offending segment for unknown types, malformed
    /// braces, empty or invalid names, duplicate names, or a `path` parameter that is not last.
    pub fn parse(path: &str) -> Result<Self, PathSyntaxError> {
        let normalized = normalize_path(path);
        let raw_segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut seen = HashSet::new();

        for (index, raw) in raw_segments.iter().enumerate() {
            let segment = parse_segment(&normalized, raw)?;

            if let PathSegment::Parameter(param) = &segment {
                if !seen.insert(Arc::clone(&param.name)) {
                    return Err(PathSyntaxError::new(
                        &normalized,
                        raw,
                        format!("duplicate parameter '{}'", param.name),
                    ));
                }
                if param.kind == ParamType::Path && index + 1 != raw_segments.len() {
                    return Err(PathSyntaxError::new(
                        &normalized,
                        raw,
                        "a 'path' parameter must be the last segment",
                    ));
                }
            }

            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Ordered segments
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &PathParam> {
        self.segments.iter().filter_map(PathSegment::as_param)
    }

    /// Look a parameter up by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&PathParam> {
        self.parameters().find(|p| p.name.as_ref() == name)
    }

    /// `true` when the template has no parameter segments
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.parameters().next().is_none()
    }

    /// `true` for `/`
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenate `self` with a child fragment.
    ///
    /// # Errors
    ///
    /// Returns the name of the first parameter declared by both fragments.
    pub fn join(&self, child: &PathTemplate) -> Result<PathTemplate, Arc<str>> {
        // Nothing can follow a greedy parameter; report it as a clash on that name.
        if let Some(param) = self.segments.last().and_then(PathSegment::as_param) {
            if param.kind == ParamType::Path && !child.is_root() {
                return Err(Arc::clone(&param.name));
            }
        }

        for param in child.parameters() {
            if self.parameter(&param.name).is_some() {
                return Err(Arc::clone(&param.name));
            }
        }

        let mut segments = self.segments.clone();
        segments.extend(child.segments.iter().cloned());
        Ok(PathTemplate { segments })
    }

    /// Attach constraints to the named parameter; `false` when there is no such parameter.
    pub(crate) fn constrain(&mut self, name: &str, constraints: &ParamConstraints) -> bool {
        for segment in &mut self.segments {
            if let PathSegment::Parameter(param) = segment {
                if param.name.as_ref() == name {
                    param.constraints = constraints.clone();
                    return true;
                }
            }
        }
        false
    }

    /// OpenAPI style path without parameter types, e.g. `/users/{id}`
    #[must_use]
    pub fn format_path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Static(text) => out.push_str(text),
                PathSegment::Parameter(param) => {
                    out.push('{');
                    out.push_str(&param.name);
                    out.push('}');
                }
            }
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for PathTemplate {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_segment(path: &str, raw: &str) -> Result<PathSegment, PathSyntaxError> {
    let inner = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => inner,
        None => {
            if raw.contains('{') || raw.contains('}') {
                return Err(PathSyntaxError::new(
                    path,
                    raw,
                    "braces are only allowed around a whole segment",
                ));
            }
            return Ok(PathSegment::Static(raw.to_string()));
        }
    };

    if inner.contains('{') || inner.contains('}') {
        return Err(PathSyntaxError::new(path, raw, "nested braces"));
    }

    let mut parts = inner.split(':');
    let name = parts.next().unwrap_or_default().trim();
    let kind = match parts.next().map(str::trim) {
        None => ParamType::Str,
        Some("") => {
            return Err(PathSyntaxError::new(
                path,
                raw,
                "missing parameter type after ':'",
            ))
        }
        Some(type_name) => ParamType::from_name(type_name).ok_or_else(|| {
            PathSyntaxError::new(
                path,
                raw,
                format!(
                    "unknown parameter type '{}', expected one of {}",
                    type_name,
                    ParamType::names()
                ),
            )
        })?,
    };

    if parts.next().is_some() {
        return Err(PathSyntaxError::new(
            path,
            raw,
            "parameters are declared as '{name:type}'",
        ));
    }
    if name.is_empty() {
        return Err(PathSyntaxError::new(
            path,
            raw,
            "parameter names must not be empty",
        ));
    }
    if !PARAM_NAME.is_match(name) {
        return Err(PathSyntaxError::new(
            path,
            raw,
            format!("'{}' is not a valid parameter name", name),
        ));
    }

    Ok(PathSegment::Parameter(PathParam {
        name: Arc::from(name),
        kind,
        constraints: ParamConstraints::default(),
    }))
}
