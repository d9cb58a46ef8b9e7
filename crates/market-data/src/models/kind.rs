use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical operation / record family.
///
/// Doubles as the operation tag on a [`FetchRequest`](super::FetchRequest) and as
/// the second half of the persistent cache key `(symbol, kind)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Quote,
    Historical,
    Fundamentals,
    Search,
    News,
}

impl RecordKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Historical => "historical",
            Self::Fundamentals => "fundamentals",
            Self::Search => "search",
            Self::News => "news",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
