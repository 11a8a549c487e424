//! Handles into the IR tables
//!
//! All handles are dense `u32` indices assigned by [`ProgramBuilder`].
//!
//! [`ProgramBuilder`]: super::builder::ProgramBuilder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Function (or closure) handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Declared identifier handle (parameter, result, local or global)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// Implicit allocation site handle (`new`, composite literal, closure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

/// Statement label handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelId(pub u32);

/// IR entity that owns an analysis location and receives a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Site {
    Var(VarId),
    Alloc(SiteId),
}

impl FuncId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SiteId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Var(v) => write!(f, "var#{}", v.0),
            Site::Alloc(s) => write!(f, "alloc#{}", s.0),
        }
    }
}
