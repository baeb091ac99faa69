//! Address identifiers backed by string interning.
//!
//! Graph node addresses and module names are compared constantly while
//! grouping and resolving dependencies, so they are interned once at parse
//! time and handled as [`Addr`] symbols afterwards.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol, Symbol as _};

/// Global string interner for address storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

/// An interned address identifier.
///
/// `Addr` wraps an interner symbol, so it is `Copy` and comparisons are
/// symbol comparisons rather than string comparisons. The original string is
/// recovered with [`Addr::resolve`] or via `Display`.
///
/// # Examples
///
/// ```
/// use terrane_core::identifier::Addr;
///
/// let a = Addr::new("aws_instance.app");
/// let b = Addr::new("aws_instance.app");
/// assert_eq!(a, b);
/// assert_eq!(a.resolve(), "aws_instance.app");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr(DefaultSymbol);

impl Addr {
    /// Interns the given string and returns its address symbol.
    pub fn new(address: &str) -> Self {
        let mut interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        Self(interner.get_or_intern(address))
    }

    /// Returns the interned string for this address.
    pub fn resolve(&self) -> String {
        let interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        interner
            .resolve(self.0)
            .expect("Symbol must exist in interner")
            .to_string()
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

// Ordered by interner index so `Addr` can key ordered graph structures.
// The order is insertion order, not lexicographic.
impl PartialOrd for Addr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Addr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.to_usize().cmp(&other.0.to_usize())
    }
}
