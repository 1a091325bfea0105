//! Entity identifiers.
//!
//! Every entity receives an [`Id`] exactly once at construction. Generated
//! identifiers hold a random UUID v4 inline. Identifiers supplied by callers
//! are interned in a global string interner. Either way the handle is `Copy`
//! and cheap to hash and compare.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};
use uuid::Uuid;

/// Global string interner for identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner. A
/// poisoned lock is recovered since the interner is append-only.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Opaque entity identifier.
///
/// Two identifiers are equal exactly when their textual forms are equal. A
/// name in the canonical hyphenated UUID form maps to the same identifier as
/// the generated UUID it spells.
///
/// # Examples
///
/// ```
/// use weft_core::identifier::Id;
///
/// let port = Id::new("port-a");
/// assert_eq!(port, "port-a");
///
/// let generated = Id::generate();
/// assert_ne!(generated, Id::generate());
/// assert_eq!(generated.to_string().len(), 36);
/// assert_eq!(generated, Id::new(&generated.to_string()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Repr {
    Named(DefaultSymbol),
    Generated(Uuid),
}

impl Id {
    /// Creates an `Id` from its textual form.
    ///
    /// # Arguments
    ///
    /// * `name` - The string representation of the identifier
    pub fn new(name: &str) -> Self {
        match canonical_uuid(name) {
            Some(uuid) => Self(Repr::Generated(uuid)),
            None => Self(Repr::Named(interner().get_or_intern(name))),
        }
    }

    /// Generates a fresh identifier from a random UUID v4.
    pub fn generate() -> Self {
        Self(Repr::Generated(Uuid::new_v4()))
    }
}

/// Parses `name` only if it is already in lowercase hyphenated form, so the
/// textual round trip is exact.
fn canonical_uuid(name: &str) -> Option<Uuid> {
    let uuid = Uuid::try_parse(name).ok()?;
    let mut buffer = Uuid::encode_buffer();
    let text: &str = uuid.hyphenated().encode_lower(&mut buffer);
    (text == name).then_some(uuid)
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Generated(uuid) => fmt::Display::fmt(&uuid.hyphenated(), f),
            Repr::Named(symbol) => match interner().resolve(symbol) {
                Some(name) => f.write_str(name),
                None => f.write_str("<unresolved>"),
            },
        }
    }
}

impl std::str::FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        match self.0 {
            Repr::Generated(uuid) => canonical_uuid(other) == Some(uuid),
            Repr::Named(symbol) => interner().resolve(symbol) == Some(other),
        }
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
