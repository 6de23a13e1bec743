//! Type-safe identifiers and logical sorts.
//!
//! This module provides newtype wrappers that keep symbolic values, named functions
//! and backend symbols apart at compile time, plus the [`Sort`] of a backend term.
use std::fmt;

/// Identifier of a symbolic value (plain variable or bit-vector).
///
/// Identifiers are handed out by a [`Session`][crate::session::Session] from a
/// monotonic counter, so an identifier is never reused, not even after a reset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValueId(u32);

impl ValueId {
    pub(crate) const fn new(id: u32) -> Self {
        ValueId(id)
    }

    /// Returns the raw identifier.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a named function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FunctionId(u32);

impl FunctionId {
    pub(crate) const fn new(id: u32) -> Self {
        FunctionId(id)
    }

    /// Returns the raw identifier.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f#{}", self.0)
    }
}

/// Identifier of a backend symbol.
///
/// Two backend symbols are the same symbol iff their identifiers are equal;
/// names are for display only and may repeat.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) const fn new(id: u32) -> Self {
        SymbolId(id)
    }

    /// Returns the raw identifier.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Logical sort of a backend term.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Sort {
    Bool,
    Int,
    /// Fixed-width bit-vector.
    ///
    /// # Invariants
    ///
    /// - The width is positive.
    BitVec(u32),
}

impl Sort {
    pub fn is_bool(self) -> bool {
        self == Sort::Bool
    }

    pub fn is_int(self) -> bool {
        self == Sort::Int
    }

    /// Returns the width of a bit-vector sort, or `None` for other sorts.
    pub fn width(self) -> Option<u32> {
        match self {
            Sort::BitVec(w) => Some(w),
            _ => None,
        }
    }
}

/// SMT-LIB notation: `Bool`, `Int`, `(_ BitVec 32)`.
impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
        }
    }
}
