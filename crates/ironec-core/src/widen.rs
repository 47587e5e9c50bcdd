//! Operator widening tables for mixed-type arithmetic.
//!
//! ADD, SUB, MUL, and DIV are not uniform over a single type class: the
//! standard also admits TIME/date arithmetic (`TIME + TIME`, `TOD - TIME`,
//! `TIME * INT`, ...). Each operator has its own static table of
//! `(left, right) -> result` triples; the narrower consults the table when
//! the demanded result type is not ANY_NUM-compatible.

use crate::id::TypeId;
use crate::type_table::TypeTable;
use crate::types::ElementaryKind;

/// One `(left, right) -> result` row of an operator widening table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidenEntry {
    pub left: ElementaryKind,
    pub right: ElementaryKind,
    pub result: ElementaryKind,
}

const fn w(left: ElementaryKind, right: ElementaryKind, result: ElementaryKind) -> WidenEntry {
    WidenEntry { left, right, result }
}

use ElementaryKind::{
    Date, DateAndTime, Dint, Int, Lint, Lreal, Real, Sint, Time, TimeOfDay, Udint, Uint, Ulint,
    Usint,
};

pub static WIDEN_ADD_TABLE: &[WidenEntry] = &[
    w(Time, Time, Time),
    w(TimeOfDay, Time, TimeOfDay),
    w(Time, TimeOfDay, TimeOfDay),
    w(DateAndTime, Time, DateAndTime),
    w(Time, DateAndTime, DateAndTime),
];

pub static WIDEN_SUB_TABLE: &[WidenEntry] = &[
    w(Time, Time, Time),
    w(Date, Date, Time),
    w(TimeOfDay, Time, TimeOfDay),
    w(TimeOfDay, TimeOfDay, Time),
    w(DateAndTime, Time, DateAndTime),
    w(DateAndTime, DateAndTime, Time),
];

pub static WIDEN_MUL_TABLE: &[WidenEntry] = &[
    w(Time, Sint, Time),
    w(Time, Int, Time),
    w(Time, Dint, Time),
    w(Time, Lint, Time),
    w(Time, Usint, Time),
    w(Time, Uint, Time),
    w(Time, Udint, Time),
    w(Time, Ulint, Time),
    w(Time, Real, Time),
    w(Time, Lreal, Time),
];

pub static WIDEN_DIV_TABLE: &[WidenEntry] = &[
    w(Time, Sint, Time),
    w(Time, Int, Time),
    w(Time, Dint, Time),
    w(Time, Lint, Time),
    w(Time, Usint, Time),
    w(Time, Uint, Time),
    w(Time, Udint, Time),
    w(Time, Ulint, Time),
    w(Time, Real, Time),
    w(Time, Lreal, Time),
];

/// Tests whether `(left, right) -> result` matches a row of `table`, after
/// resolving each type to its underlying elementary kind.
pub fn is_widening_compatible(
    table: &[WidenEntry],
    types: &TypeTable,
    left: TypeId,
    right: TypeId,
    result: TypeId,
) -> bool {
    let (Some(l), Some(r), Some(res)) = (
        types.base_elementary(left),
        types.base_elementary(right),
        types.base_elementary(result),
    ) else {
        return false;
    };
    table
        .iter()
        .any(|e| e.left == l && e.right == r && e.result == res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    #[test]
    fn add_time_time_is_time() {
        let table = TypeTable::new();
        assert!(is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            TypeId::TIME,
            TypeId::TIME,
            TypeId::TIME
        ));
    }

    #[test]
    fn add_is_symmetric_for_tod_and_time() {
        let table = TypeTable::new();
        assert!(is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            TypeId::TOD,
            TypeId::TIME,
            TypeId::TOD
        ));
        assert!(is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            TypeId::TIME,
            TypeId::TOD,
            TypeId::TOD
        ));
    }

    #[test]
    fn sub_date_date_is_time() {
        let table = TypeTable::new();
        assert!(is_widening_compatible(
            WIDEN_SUB_TABLE,
            &table,
            TypeId::DATE,
            TypeId::DATE,
            TypeId::TIME
        ));
        // but DATE + DATE is not addable
        assert!(!is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            TypeId::DATE,
            TypeId::DATE,
            TypeId::TIME
        ));
    }

    #[test]
    fn sub_is_not_symmetric() {
        let table = TypeTable::new();
        assert!(is_widening_compatible(
            WIDEN_SUB_TABLE,
            &table,
            TypeId::TOD,
            TypeId::TIME,
            TypeId::TOD
        ));
        assert!(!is_widening_compatible(
            WIDEN_SUB_TABLE,
            &table,
            TypeId::TIME,
            TypeId::TOD,
            TypeId::TOD
        ));
    }

    #[test]
    fn mul_time_by_any_num() {
        let table = TypeTable::new();
        for n in [TypeId::SINT, TypeId::INT, TypeId::UDINT, TypeId::LREAL] {
            assert!(is_widening_compatible(
                WIDEN_MUL_TABLE,
                &table,
                TypeId::TIME,
                n,
                TypeId::TIME
            ));
            // the numeric factor must be on the right
            assert!(!is_widening_compatible(
                WIDEN_MUL_TABLE,
                &table,
                n,
                TypeId::TIME,
                TypeId::TIME
            ));
        }
    }

    #[test]
    fn widening_resolves_derived_types() {
        let mut table = TypeTable::new();
        let delay = table
            .register_named(
                "DELAY",
                TypeKind::Derived {
                    name: "DELAY".into(),
                    base: TypeId::TIME,
                },
            )
            .unwrap();
        assert!(is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            delay,
            TypeId::TIME,
            TypeId::TIME
        ));
    }

    #[test]
    fn non_elementary_operands_never_widen() {
        let mut table = TypeTable::new();
        let light = table
            .register_named("LIGHT", TypeKind::Enumerated { name: "LIGHT".into() })
            .unwrap();
        assert!(!is_widening_compatible(
            WIDEN_ADD_TABLE,
            &table,
            light,
            TypeId::TIME,
            TypeId::TIME
        ));
    }
}
