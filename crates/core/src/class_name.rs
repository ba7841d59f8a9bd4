//! Fully-qualified Java class names, e.g. `com.google.Foo`.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A fully-qualified class name. Opaque beyond being non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> ClassName {
        ClassName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(s: &str) -> ClassName {
        ClassName(s.to_string())
    }
}

impl From<String> for ClassName {
    fn from(s: String) -> ClassName {
        ClassName(s)
    }
}
