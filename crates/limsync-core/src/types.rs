//! Repository identifiers and the scoped session value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace tagging every key-value annotation this tool writes.
///
/// Versioned so a future metadata layout can coexist with annotations
/// already attached under this one.
pub const METADATA_NAMESPACE: &str = "jax.org/omeroutils/jaxlims/v0";

macro_rules! repository_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

repository_id!(
    /// An image asset in the repository.
    ImageId
);
repository_id!(
    /// A Project or Dataset.
    ContainerId
);
repository_id!(
    /// A key-value annotation.
    AnnotationId
);

/// The two container levels images are filed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Project,
    Dataset,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Dataset => "Dataset",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object type an annotation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTarget {
    Image,
}

impl AnnotationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
        }
    }
}

/// A repository account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experimenter {
    pub id: i64,
    pub name: String,
}

/// A repository group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// Opaque credential proving an authenticated session. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// An authenticated session narrowed to one image owner and one group.
///
/// Built once after login and passed by reference into every repository
/// call. Nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedSession {
    user: Experimenter,
    group: Group,
    token: SessionToken,
}

impl ScopedSession {
    pub fn new(user: Experimenter, group: Group, token: SessionToken) -> Self {
        Self { user, group, token }
    }

    /// Account owning the images being organized.
    pub fn user(&self) -> &Experimenter {
        &self.user
    }

    /// Group the orphan search and all writes are scoped to.
    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}
