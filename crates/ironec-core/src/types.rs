//! The IEC 61131-3 type vocabulary.
//!
//! Provides the 21 elementary types of the standard plus the derived-type
//! kinds that can appear in candidate lists: named derived types, subranges,
//! enumerations, and function-block types (an FB instance's datatype is its
//! FB declaration).
//!
//! The generic type classes of the standard (`ANY_NUM`, `ANY_BIT`, ...) are
//! not types of their own; they exist only as category predicates on
//! [`ElementaryKind`]. The hierarchy is:
//! `ANY -> ANY_ELEMENTARY -> {ANY_MAGNITUDE, ANY_BIT, ANY_STRING, ANY_DATE}`;
//! `ANY_MAGNITUDE -> {ANY_NUM, TIME}`; `ANY_NUM -> ANY_REAL | ANY_INT`.

use serde::{Deserialize, Serialize};

use crate::id::{PouId, TypeId};

/// The elementary types of IEC 61131-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementaryKind {
    Bool,
    Byte,
    Word,
    Dword,
    Lword,
    Sint,
    Int,
    Dint,
    Lint,
    Usint,
    Uint,
    Udint,
    Ulint,
    Real,
    Lreal,
    Time,
    Date,
    TimeOfDay,
    DateAndTime,
    String,
    WString,
}

impl ElementaryKind {
    /// ANY_BIT: BOOL and the bit-string types.
    pub fn is_any_bit(self) -> bool {
        matches!(
            self,
            ElementaryKind::Bool
                | ElementaryKind::Byte
                | ElementaryKind::Word
                | ElementaryKind::Dword
                | ElementaryKind::Lword
        )
    }

    /// ANY_INT: the signed and unsigned integer types.
    pub fn is_any_int(self) -> bool {
        matches!(
            self,
            ElementaryKind::Sint
                | ElementaryKind::Int
                | ElementaryKind::Dint
                | ElementaryKind::Lint
                | ElementaryKind::Usint
                | ElementaryKind::Uint
                | ElementaryKind::Udint
                | ElementaryKind::Ulint
        )
    }

    /// ANY_REAL: REAL and LREAL.
    pub fn is_any_real(self) -> bool {
        matches!(self, ElementaryKind::Real | ElementaryKind::Lreal)
    }

    /// ANY_NUM: ANY_INT or ANY_REAL.
    pub fn is_any_num(self) -> bool {
        self.is_any_int() || self.is_any_real()
    }

    /// ANY_MAGNITUDE: ANY_NUM or TIME.
    pub fn is_any_magnitude(self) -> bool {
        self.is_any_num() || self == ElementaryKind::Time
    }

    /// ANY_STRING: STRING and WSTRING.
    pub fn is_any_string(self) -> bool {
        matches!(self, ElementaryKind::String | ElementaryKind::WString)
    }

    /// ANY_DATE: DATE, TIME_OF_DAY, DATE_AND_TIME.
    pub fn is_any_date(self) -> bool {
        matches!(
            self,
            ElementaryKind::Date | ElementaryKind::TimeOfDay | ElementaryKind::DateAndTime
        )
    }
}

/// A type as it appears in a candidate list or declaration.
///
/// Elementary types are interned at fixed [`TypeId`]s by the
/// [`TypeTable`](crate::type_table::TypeTable); derived kinds are registered
/// on top of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// One of the 21 elementary types.
    Elementary(ElementaryKind),
    /// A named derived type (`TYPE Speed : INT; END_TYPE`).
    Derived { name: String, base: TypeId },
    /// A subrange over an integer base type.
    Subrange { base: TypeId },
    /// A named enumerated type.
    Enumerated { name: String },
    /// A function-block type. FB instances carry this as their datatype.
    FunctionBlock(PouId),
}
