//! Object paths and the segment-exact ancestor walk.
//!
//! A path is `/` or a sequence of `/`-prefixed segments made of ASCII
//! letters, digits and underscores. Ancestry is decided on segment
//! boundaries only, so `/abcd` is never considered to live under `/ab`.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Validated object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Text of the root path.
    pub const ROOT: &'static str = "/";

    /// Validates and wraps a path.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] describing the first grammar violation.
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        validate(&path)?;
        Ok(Self(path))
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_owned())
    }

    /// Borrows the path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` for `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        ancestors(self.as_str())
            .next()
            .map(|parent| Self(parent.to_owned()))
    }

    /// Path segments in order; empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Returns `true` when `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &str) -> bool {
        child_segment(ancestor, self.as_str()).is_some()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = PathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// `Hash` and `Eq` are derived from the inner `String`, which agree with
// `str`, so tables keyed by `ObjectPath` can be queried with plain text.
impl Borrow<str> for ObjectPath {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// Grammar violations reported by [`validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path was the empty string.
    #[error("object path is empty")]
    Empty,
    /// The path did not begin with `/`.
    #[error("object path '{path}' must start with '/'")]
    NotAbsolute {
        /// Offending path.
        path: String,
    },
    /// A non-root path ended with `/`.
    #[error("object path '{path}' has a trailing '/'")]
    TrailingSlash {
        /// Offending path.
        path: String,
    },
    /// Two separators appeared back to back.
    #[error("object path '{path}' contains an empty segment")]
    EmptySegment {
        /// Offending path.
        path: String,
    },
    /// A character outside `[A-Za-z0-9_]` appeared in a segment.
    #[error("object path '{path}' contains invalid character {character:?} at byte {position}")]
    InvalidCharacter {
        /// Offending path.
        path: String,
        /// The rejected character.
        character: char,
        /// Byte offset of the character.
        position: usize,
    },
}

/// Checks `path` against the object path grammar.
///
/// # Errors
///
/// Returns the first violation found, scanning left to right.
pub fn validate(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute {
            path: path.to_owned(),
        });
    }
    if path == ObjectPath::ROOT {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(PathError::TrailingSlash {
            path: path.to_owned(),
        });
    }

    let mut previous_was_separator = false;
    for (position, character) in path.char_indices() {
        if character == '/' {
            if previous_was_separator {
                return Err(PathError::EmptySegment {
                    path: path.to_owned(),
                });
            }
            previous_was_separator = true;
            continue;
        }
        previous_was_separator = false;
        if !(character.is_ascii_alphanumeric() || character == '_') {
            return Err(PathError::InvalidCharacter {
                path: path.to_owned(),
                character,
                position,
            });
        }
    }
    Ok(())
}

/// Strict ancestors of `path`, nearest first, ending with `/`.
///
/// Works on arbitrary text: anything without a `/` has no ancestors, and a
/// relative string never reaches the root.
pub(crate) fn ancestors(path: &str) -> Ancestors<'_> {
    Ancestors {
        remaining: Some(path),
    }
}

/// Iterator returned by [`ancestors`].
pub(crate) struct Ancestors<'a> {
    remaining: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.remaining.take()?;
        let cut = current.rfind('/')?;
        let parent = if cut == 0 {
            if current.len() == 1 {
                return None;
            }
            ObjectPath::ROOT
        } else {
            current.get(..cut)?
        };
        self.remaining = Some(parent);
        Some(parent)
    }
}

/// First segment of `descendant` below `ancestor`, if it is a strict
/// descendant.
pub(crate) fn child_segment<'a>(ancestor: &str, descendant: &'a str) -> Option<&'a str> {
    let rest = if ancestor == ObjectPath::ROOT {
        descendant.strip_prefix('/')?
    } else {
        descendant.strip_prefix(ancestor)?.strip_prefix('/')?
    };
    rest.split('/').next().filter(|segment| !segment.is_empty())
}
