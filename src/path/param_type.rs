use std::fmt;

/// Declared type of a path parameter (`{name:type}`).
///
/// The set is closed: unknown type names are rejected when the template is parsed, never at
/// request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamType {
    /// Any single segment
    Str,
    /// Remainder of the path including `/`, must be the last segment
    Path,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Arbitrary precision decimal
    Decimal,
    /// RFC 4122 UUID
    Uuid,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Timestamp with offset
    DateTime,
    /// Duration
    TimeDelta,
}

impl ParamType {
    /// Every supported type, in declaration order
    pub const ALL: [ParamType; 10] = [
        ParamType::Str,
        ParamType::Path,
        ParamType::Int,
        ParamType::Float,
        ParamType::Decimal,
        ParamType::Uuid,
        ParamType::Date,
        ParamType::Time,
        ParamType::DateTime,
        ParamType::TimeDelta,
    ];

    /// Type name as written in path templates
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Str => "str",
            ParamType::Path => "path",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Decimal => "decimal",
            ParamType::Uuid => "uuid",
            ParamType::Date => "date",
            ParamType::Time => "time",
            ParamType::DateTime => "datetime",
            ParamType::TimeDelta => "timedelta",
        }
    }

    /// Look a type up by its template name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Comma separated list of valid names, for error messages
    pub(crate) fn names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Order in which sibling parameter children are tried; lower goes first.
    ///
    /// Narrow types come before wide ones so `/{id:int}` wins over `/{id:str}` for `42`,
    /// and `str` is always the fallback.
    pub(crate) fn specificity(self) -> u8 {
        match self {
            ParamType::Uuid => 0,
            ParamType::Int => 1,
            ParamType::Date => 2,
            ParamType::DateTime => 3,
            ParamType::Time => 4,
            ParamType::TimeDelta => 5,
            ParamType::Float => 6,
            ParamType::Decimal => 7,
            ParamType::Str => 8,
            ParamType::Path => 9,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
