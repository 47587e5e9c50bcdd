//! TypeId interning and structural type equality.
//!
//! Every type is registered in the [`TypeTable`] and referenced by
//! [`TypeId`]. The table pre-registers the 21 elementary IEC types on
//! construction, so elementary lookups never allocate.
//!
//! Equality between types is *structural* ([`TypeTable::is_type_equal`]):
//! elementary types compare by kind, derived and enumerated types by name,
//! subranges by resolved base, function-block types by declaration identity.
//! This is the single equality predicate used by the narrowing pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::TypeId;
use crate::types::{ElementaryKind, TypeKind};

/// Pre-registered TypeId constants for the elementary types.
impl TypeId {
    pub const BOOL: TypeId = TypeId(0);
    pub const BYTE: TypeId = TypeId(1);
    pub const WORD: TypeId = TypeId(2);
    pub const DWORD: TypeId = TypeId(3);
    pub const LWORD: TypeId = TypeId(4);
    pub const SINT: TypeId = TypeId(5);
    pub const INT: TypeId = TypeId(6);
    pub const DINT: TypeId = TypeId(7);
    pub const LINT: TypeId = TypeId(8);
    pub const USINT: TypeId = TypeId(9);
    pub const UINT: TypeId = TypeId(10);
    pub const UDINT: TypeId = TypeId(11);
    pub const ULINT: TypeId = TypeId(12);
    pub const REAL: TypeId = TypeId(13);
    pub const LREAL: TypeId = TypeId(14);
    pub const TIME: TypeId = TypeId(15);
    pub const DATE: TypeId = TypeId(16);
    pub const TOD: TypeId = TypeId(17);
    pub const DT: TypeId = TypeId(18);
    pub const STRING: TypeId = TypeId(19);
    pub const WSTRING: TypeId = TypeId(20);
}

const ELEMENTARY_ORDER: [ElementaryKind; 21] = [
    ElementaryKind::Bool,
    ElementaryKind::Byte,
    ElementaryKind::Word,
    ElementaryKind::Dword,
    ElementaryKind::Lword,
    ElementaryKind::Sint,
    ElementaryKind::Int,
    ElementaryKind::Dint,
    ElementaryKind::Lint,
    ElementaryKind::Usint,
    ElementaryKind::Uint,
    ElementaryKind::Udint,
    ElementaryKind::Ulint,
    ElementaryKind::Real,
    ElementaryKind::Lreal,
    ElementaryKind::Time,
    ElementaryKind::Date,
    ElementaryKind::TimeOfDay,
    ElementaryKind::DateAndTime,
    ElementaryKind::String,
    ElementaryKind::WString,
];

/// Registry of all types in a program, providing identity via [`TypeId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeTable {
    /// Types indexed by TypeId.0
    types: Vec<TypeKind>,
    /// Named type lookup (for derived and enumerated types)
    names: HashMap<String, TypeId>,
}

impl TypeTable {
    /// Creates a new table with the 21 elementary types pre-registered at
    /// the [`TypeId`] constants.
    pub fn new() -> Self {
        TypeTable {
            types: ELEMENTARY_ORDER
                .iter()
                .map(|&k| TypeKind::Elementary(k))
                .collect(),
            names: HashMap::new(),
        }
    }

    /// Registers a type and returns its new [`TypeId`].
    pub fn register(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    /// Registers a named type (derived, enumerated), returning its [`TypeId`].
    ///
    /// Returns [`CoreError::DuplicateTypeName`] if a type with the same name
    /// already exists.
    pub fn register_named(&mut self, name: &str, kind: TypeKind) -> Result<TypeId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        let id = self.register(kind);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a type by its [`TypeId`].
    pub fn get(&self, id: TypeId) -> Option<&TypeKind> {
        self.types.get(id.0 as usize)
    }

    /// Looks up a named type's [`TypeId`] by name.
    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Returns the pre-registered [`TypeId`] for an elementary kind.
    pub fn elementary_id(&self, kind: ElementaryKind) -> TypeId {
        match kind {
            ElementaryKind::Bool => TypeId::BOOL,
            ElementaryKind::Byte => TypeId::BYTE,
            ElementaryKind::Word => TypeId::WORD,
            ElementaryKind::Dword => TypeId::DWORD,
            ElementaryKind::Lword => TypeId::LWORD,
            ElementaryKind::Sint => TypeId::SINT,
            ElementaryKind::Int => TypeId::INT,
            ElementaryKind::Dint => TypeId::DINT,
            ElementaryKind::Lint => TypeId::LINT,
            ElementaryKind::Usint => TypeId::USINT,
            ElementaryKind::Uint => TypeId::UINT,
            ElementaryKind::Udint => TypeId::UDINT,
            ElementaryKind::Ulint => TypeId::ULINT,
            ElementaryKind::Real => TypeId::REAL,
            ElementaryKind::Lreal => TypeId::LREAL,
            ElementaryKind::Time => TypeId::TIME,
            ElementaryKind::Date => TypeId::DATE,
            ElementaryKind::TimeOfDay => TypeId::TOD,
            ElementaryKind::DateAndTime => TypeId::DT,
            ElementaryKind::String => TypeId::STRING,
            ElementaryKind::WString => TypeId::WSTRING,
        }
    }

    /// Resolves derived-type and subrange chains to the underlying type.
    ///
    /// Elementary, enumerated, and function-block types resolve to themselves,
    /// as does an unregistered id.
    pub fn base_type(&self, id: TypeId) -> TypeId {
        let mut current = id;
        loop {
            match self.get(current) {
                Some(TypeKind::Derived { base, .. }) | Some(TypeKind::Subrange { base }) => {
                    current = *base;
                }
                _ => return current,
            }
        }
    }

    /// The elementary kind underlying `id`, if its base resolves to one.
    pub fn base_elementary(&self, id: TypeId) -> Option<ElementaryKind> {
        match self.get(self.base_type(id)) {
            Some(TypeKind::Elementary(k)) => Some(*k),
            _ => None,
        }
    }

    /// Structural type equality.
    pub fn is_type_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(TypeKind::Elementary(x)), Some(TypeKind::Elementary(y))) => x == y,
            (
                Some(TypeKind::Derived { name: n1, .. }),
                Some(TypeKind::Derived { name: n2, .. }),
            ) => n1 == n2,
            (Some(TypeKind::Subrange { base: b1 }), Some(TypeKind::Subrange { base: b2 })) => {
                self.is_type_equal(self.base_type(*b1), self.base_type(*b2))
            }
            (
                Some(TypeKind::Enumerated { name: n1 }),
                Some(TypeKind::Enumerated { name: n2 }),
            ) => n1 == n2,
            (Some(TypeKind::FunctionBlock(p1)), Some(TypeKind::FunctionBlock(p2))) => p1 == p2,
            _ => false,
        }
    }

    /// Index of the first candidate structurally equal to `desired`.
    pub fn search_in_candidates(&self, desired: TypeId, candidates: &[TypeId]) -> Option<usize> {
        candidates
            .iter()
            .position(|&c| self.is_type_equal(desired, c))
    }

    // -- Category predicates. All resolve derived/subrange chains first. --

    pub fn is_bool(&self, id: TypeId) -> bool {
        self.base_elementary(id) == Some(ElementaryKind::Bool)
    }

    pub fn is_time(&self, id: TypeId) -> bool {
        self.base_elementary(id) == Some(ElementaryKind::Time)
    }

    pub fn is_any_bit(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_bit())
    }

    pub fn is_any_int(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_int())
    }

    pub fn is_any_real(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_real())
    }

    pub fn is_any_num(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_num())
    }

    /// ANY_NUM after resolving derived-type chains -- the test used by the
    /// arithmetic narrower to decide between uniform propagation and the
    /// widening tables.
    pub fn is_any_num_compatible(&self, id: TypeId) -> bool {
        self.is_any_num(id)
    }

    pub fn is_any_magnitude(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_magnitude())
    }

    pub fn is_any_string(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_string())
    }

    pub fn is_any_date(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some_and(|k| k.is_any_date())
    }

    /// Every elementary type; derived types count through their base.
    pub fn is_any_elementary(&self, id: TypeId) -> bool {
        self.base_elementary(id).is_some()
    }

    /// Enumerated types, directly or through a derived-type chain.
    pub fn is_enumerated(&self, id: TypeId) -> bool {
        matches!(self.get(self.base_type(id)), Some(TypeKind::Enumerated { .. }))
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
