use crate::coerce::{coerce, ParamValue};
use crate::path::{join_paths, ParamType, PathSegment, PathTemplate};

/// Declared types that also accept a string value, as long as it coerces
const STRING_ACCEPTING: &[ParamType] = &[
    ParamType::DateTime,
    ParamType::Date,
    ParamType::Time,
    ParamType::TimeDelta,
    ParamType::Float,
    ParamType::Path,
];

/// Fill `template` with `params`; the error is a human readable reason.
pub(crate) fn reverse_path(
    template: &PathTemplate,
    params: &[(&str, ParamValue)],
) -> Result<String, String> {
    let mut parts: Vec<String> = Vec::with_capacity(template.segments().len());

    for segment in template.segments() {
        match segment {
            PathSegment::Static(text) => parts.push(text.to_string()),
            PathSegment::Parameter(param) => {
                let value = params
                    .iter()
                    .rev()
                    .find(|(key, _)| *key == param.name.as_ref())
                    .map(|(_, value)| value)
                    .ok_or_else(|| format!("missing value for path parameter '{}'", param.name))?;

                if !accepts(param.kind, value) {
                    return Err(format!(
                        "received type for path parameter '{}' doesn't match declared type {}",
                        param.name, param.kind
                    ));
                }
                let text = value.to_string();
                if param.kind == ParamType::Path {
                    if text.trim_matches('/').is_empty() {
                        return Err(format!("empty value for path parameter '{}'", param.name));
                    }
                } else if text.is_empty() || text.contains('/') {
                    return Err(format!(
                        "value for path parameter '{}' must be one non-empty segment, got '{text}'",
                        param.name
                    ));
                }
                parts.push(text);
            }
        }
    }

    Ok(join_paths(&parts))
}

fn accepts(kind: ParamType, value: &ParamValue) -> bool {
    if value.kind() == kind {
        return true;
    }
    match value {
        ParamValue::Str(raw) if STRING_ACCEPTING.contains(&kind) => coerce(kind, raw).is_ok(),
        _ => false,
    }
}
