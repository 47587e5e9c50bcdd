//! Program organization unit declarations.
//!
//! [`PouDecl`] describes a function, function block, or program as the
//! narrowing pass needs to see it: the input parameters in declaration
//! order, the return type, and whether the declaration is extensible (the
//! standard functions like `ADD` accept a variadic tail of same-typed
//! parameters).
//!
//! [`ParamIter`] reproduces the original's parameter iterator: it walks the
//! declared inputs and, for an extensible declaration, keeps yielding the
//! extensible parameter past the end of the declared list with synthesized
//! names (`IN3`, `IN4`, ...) and an extensible index. The index of the
//! highest extensible parameter a call actually uses is recorded on the
//! call node for code generation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{NodeId, PouId, TypeId};

/// What kind of POU a declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PouKind {
    Function,
    FunctionBlock,
    Program,
}

/// Direction of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamDirection {
    Input,
    Output,
    InOut,
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeId,
    pub direction: ParamDirection,
}

impl ParamDecl {
    pub fn input(name: &str, ty: TypeId) -> Self {
        ParamDecl {
            name: name.to_string(),
            ty,
            direction: ParamDirection::Input,
        }
    }
}

/// A function, function block, or program declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PouDecl {
    pub name: String,
    pub kind: PouKind,
    /// `None` for function blocks and programs.
    pub return_type: Option<TypeId>,
    pub params: Vec<ParamDecl>,
    /// Index of the first extensible parameter; the parameters from here to
    /// the end of `params` repeat indefinitely.
    pub extensible_from: Option<usize>,
}

impl PouDecl {
    pub fn function(name: &str, return_type: TypeId, params: Vec<ParamDecl>) -> Self {
        PouDecl {
            name: name.to_string(),
            kind: PouKind::Function,
            return_type: Some(return_type),
            params,
            extensible_from: None,
        }
    }

    pub fn function_block(name: &str, params: Vec<ParamDecl>) -> Self {
        PouDecl {
            name: name.to_string(),
            kind: PouKind::FunctionBlock,
            return_type: None,
            params,
            extensible_from: None,
        }
    }

    pub fn extensible(mut self, from: usize) -> Self {
        self.extensible_from = Some(from);
        self
    }

    /// Index of the first extensible parameter, if the POU is extensible.
    pub fn first_extensible_param_index(&self) -> Option<usize> {
        self.extensible_from
    }

    /// Iterates over the input parameters, extending past the declared list
    /// for extensible declarations.
    pub fn param_iter(&self) -> ParamIter<'_> {
        ParamIter { decl: self, pos: 0 }
    }

    /// Resolves a formal parameter name against this declaration, including
    /// the synthesized names of extensible parameters (`IN3`, ...).
    pub fn search_param(&self, name: &str) -> Option<ParamView> {
        if let Some(pos) = self.params.iter().position(|p| p.name == name) {
            return Some(self.view_at(pos));
        }
        // Try the extensible tail: the name must be the extensible
        // parameter's stem followed by a number past the declared range.
        let ext = self.extensible_from?;
        let stem = name_stem(&self.params.last()?.name);
        let suffix = name.strip_prefix(stem)?;
        let n: usize = suffix.parse().ok()?;
        let first_n = name_number(&self.params[ext].name)?;
        if n < first_n {
            return None;
        }
        let pos = ext + (n - first_n);
        if pos < self.params.len() {
            return Some(self.view_at(pos));
        }
        self.synthesized_view(pos)
    }

    fn view_at(&self, pos: usize) -> ParamView {
        let p = &self.params[pos];
        ParamView {
            name: p.name.clone(),
            ty: p.ty,
            direction: p.direction,
            extensible_index: self
                .extensible_from
                .filter(|&e| pos >= e)
                .map(|_| pos as i32),
        }
    }

    fn synthesized_view(&self, pos: usize) -> Option<ParamView> {
        let last = self.params.last()?;
        Some(ParamView {
            name: format!("{}{}", name_stem(&last.name), pos + 1),
            ty: last.ty,
            direction: last.direction,
            extensible_index: Some(pos as i32),
        })
    }
}

/// A view of one parameter as produced by [`ParamIter`] or
/// [`PouDecl::search_param`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamView {
    pub name: String,
    pub ty: TypeId,
    pub direction: ParamDirection,
    /// The parameter's extensible index, when it lies in the extensible tail.
    pub extensible_index: Option<i32>,
}

/// Iterator over a declaration's parameters; see [`PouDecl::param_iter`].
pub struct ParamIter<'a> {
    decl: &'a PouDecl,
    pos: usize,
}

impl Iterator for ParamIter<'_> {
    type Item = ParamView;

    fn next(&mut self) -> Option<ParamView> {
        let pos = self.pos;
        if pos < self.decl.params.len() {
            self.pos += 1;
            return Some(self.decl.view_at(pos));
        }
        // Past the declared list: only extensible declarations continue.
        self.decl.extensible_from?;
        self.pos += 1;
        self.decl.synthesized_view(pos)
    }
}

fn name_stem(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

fn name_number(name: &str) -> Option<usize> {
    let stem = name_stem(name);
    name[stem.len()..].parse().ok()
}

/// Registry of POU declarations, with overload lookup by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    pous: Vec<PouDecl>,
    by_name: IndexMap<String, SmallVec<[PouId; 2]>>,
}

impl Library {
    pub fn new() -> Self {
        Library::default()
    }

    /// Registers a declaration, returning its id. The same name may be
    /// registered repeatedly -- overloaded standard functions have one
    /// declaration per signature.
    pub fn add(&mut self, decl: PouDecl) -> PouId {
        let id = PouId(self.pous.len() as u32);
        self.by_name
            .entry(decl.name.clone())
            .or_default()
            .push(id);
        self.pous.push(decl);
        id
    }

    pub fn get(&self, id: PouId) -> Option<&PouDecl> {
        self.pous.get(id.0 as usize)
    }

    /// Every declaration registered under `name`.
    pub fn overloads(&self, name: &str) -> &[PouId] {
        self.by_name.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn pou_count(&self) -> usize {
        self.pous.len()
    }
}

/// The capability the narrower needs from the surrounding symbol table:
/// resolving an FB-instance name in the current POU scope to its FB type.
pub trait FbInstanceResolver {
    fn fb_type(&self, instance: &str) -> Option<TypeId>;
}

/// A flat map of instance names to FB types, covering one POU scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeMap {
    instances: IndexMap<String, TypeId>,
}

impl ScopeMap {
    pub fn new() -> Self {
        ScopeMap::default()
    }

    pub fn insert(&mut self, instance: &str, fb_type: TypeId) {
        self.instances.insert(instance.to_string(), fb_type);
    }
}

impl FbInstanceResolver for ScopeMap {
    fn fb_type(&self, instance: &str) -> Option<TypeId> {
        self.instances.get(instance).copied()
    }
}

/// One POU ready for narrowing: its declaration, its variable declaration
/// nodes, and its body nodes (statements, or a single instruction list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pou {
    pub decl: PouId,
    pub var_decls: Vec<NodeId>,
    pub body: Vec<NodeId>,
}
