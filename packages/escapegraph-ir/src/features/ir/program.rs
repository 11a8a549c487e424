//! Program tables: functions, declared identifiers, allocation sites

use super::ids::{FuncId, SiteId, VarId};
use super::node::{AllocKind, Stmt};
use serde::{Deserialize, Serialize};

/// Storage class of a declared identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarClass {
    Param,
    Result,
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: VarId,
    pub name: String,
    pub class: VarClass,
    /// Declaring function (`None` for globals)
    pub func: Option<FuncId>,
}

impl VarDecl {
    pub fn is_global(&self) -> bool {
        self.class == VarClass::Global
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<VarId>,
    pub results: Vec<VarId>,
    pub locals: Vec<VarId>,
    /// `None` for functions implemented outside the program
    pub body: Option<Vec<Stmt>>,
    /// Lexically enclosing function, set for closures only
    pub enclosing: Option<FuncId>,
    /// Variables of enclosing functions referenced by this closure
    pub captures: Vec<VarId>,
    /// External function whose parameters are known not to escape
    pub noescape: bool,
}

impl FunctionDecl {
    /// Declared-in list in signature order: params, results, locals
    pub fn declared(&self) -> impl Iterator<Item = VarId> + '_ {
        self.params
            .iter()
            .chain(self.results.iter())
            .chain(self.locals.iter())
            .copied()
    }

    pub fn is_closure(&self) -> bool {
        self.enclosing.is_some()
    }

    pub fn is_external(&self) -> bool {
        self.body.is_none()
    }

    pub fn body(&self) -> &[Stmt] {
        self.body.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub id: SiteId,
    pub kind: AllocKind,
    /// Function whose body contains the site
    pub func: FuncId,
}

/// A complete input program
///
/// Tables are indexed by the dense ids handed out by `ProgramBuilder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub(crate) functions: Vec<FunctionDecl>,
    pub(crate) vars: Vec<VarDecl>,
    pub(crate) sites: Vec<SiteInfo>,
}

impl Program {
    pub fn function(&self, id: FuncId) -> Option<&FunctionDecl> {
        self.functions.get(id.index())
    }

    pub fn var(&self, id: VarId) -> Option<&VarDecl> {
        self.vars.get(id.index())
    }

    pub fn site(&self, id: SiteId) -> Option<&SiteInfo> {
        self.sites.get(id.index())
    }

    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }

    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    pub fn sites(&self) -> &[SiteInfo] {
        &self.sites
    }

    pub fn globals(&self) -> impl Iterator<Item = &VarDecl> + '_ {
        self.vars.iter().filter(|v| v.is_global())
    }

    /// Functions that are not closures
    pub fn top_level(&self) -> impl Iterator<Item = &FunctionDecl> + '_ {
        self.functions.iter().filter(|f| !f.is_closure())
    }

    /// Outermost function lexically enclosing `func` (itself if top-level)
    pub fn outermost(&self, func: FuncId) -> FuncId {
        let mut current = func;
        // bounded by the number of functions in case of a malformed cycle
        for _ in 0..=self.functions.len() {
            match self.function(current).and_then(|f| f.enclosing) {
                Some(outer) => current = outer,
                None => break,
            }
        }
        current
    }

    /// Whether `inner` is a closure nested (at any depth) inside `outer`
    pub fn contains_closure(&self, outer: FuncId, inner: FuncId) -> bool {
        if outer == inner {
            return false;
        }
        let mut current = inner;
        for _ in 0..=self.functions.len() {
            match self.function(current).and_then(|f| f.enclosing) {
                Some(enclosing) if enclosing == outer => return true,
                Some(enclosing) => current = enclosing,
                None => return false,
            }
        }
        false
    }

    /// Closures lexically nested in `func`, transitively, in id order
    pub fn nested_closures(&self, func: FuncId) -> Vec<FuncId> {
        self.functions
            .iter()
            .filter(|f| f.is_closure() && self.contains_closure(func, f.id))
            .map(|f| f.id)
            .collect()
    }

    pub fn var_name(&self, id: VarId) -> &str {
        self.var(id).map(|v| v.name.as_str()).unwrap_or("?")
    }

    pub fn func_name(&self, id: FuncId) -> &str {
        self.function(id).map(|f| f.name.as_str()).unwrap_or("?")
    }
}
