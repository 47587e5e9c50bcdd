pub mod ast;
pub mod decl;
pub mod error;
pub mod id;
pub mod ops;
pub mod type_table;
pub mod types;
pub mod widen;

// Re-export commonly used types
pub use ast::{Ast, CallAnnotations, Narrowed, Node, NodeKind};
pub use decl::{
    FbInstanceResolver, Library, ParamDecl, ParamDirection, ParamIter, ParamView, Pou, PouDecl,
    PouKind, ScopeMap,
};
pub use error::CoreError;
pub use id::{NodeId, PouId, TypeId};
pub use ops::{
    ArithOp, CmpOp, FbParamOp, IlCallOp, IlJumpOp, IlReturnOp, IlSimpleOp, LogicOp, UnaryOp,
};
pub use type_table::TypeTable;
pub use types::{ElementaryKind, TypeKind};
pub use widen::{
    is_widening_compatible, WidenEntry, WIDEN_ADD_TABLE, WIDEN_DIV_TABLE, WIDEN_MUL_TABLE,
    WIDEN_SUB_TABLE,
};
