//! Evaluation context: where the value of an expression goes

use super::location::{LocationId, Note};
use crate::errors::{EscapeGraphError, EscapeResult};
use crate::features::ir::Site;

/// Destination of an expression's value
///
/// `dst == None` is the discard hole: flows into it are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hole {
    pub dst: Option<LocationId>,
    pub derefs: i32,
    /// The address of the flowing value is taken somewhere along this hole
    pub addrtaken: bool,
    pub notes: Vec<Note>,
}

impl Hole {
    pub fn discard() -> Self {
        Self {
            dst: None,
            derefs: 0,
            addrtaken: false,
            notes: Vec::new(),
        }
    }

    pub fn to(dst: LocationId) -> Self {
        Self {
            dst: Some(dst),
            ..Self::discard()
        }
    }

    pub fn is_discard(&self) -> bool {
        self.dst.is_none()
    }

    /// Adjust the indirection count; the result may not drop below -1
    pub fn shift(mut self, delta: i32) -> EscapeResult<Self> {
        self.derefs += delta;
        if self.derefs < -1 {
            return Err(EscapeGraphError::internal(format!(
                "hole derefs underflow ({})",
                self.derefs
            )));
        }
        self.addrtaken = delta < 0;
        Ok(self)
    }

    pub fn deref(self) -> EscapeResult<Self> {
        self.shift(1)
    }

    pub fn addr(self) -> EscapeResult<Self> {
        self.shift(-1)
    }

    pub fn note(mut self, why: &'static str, site: Option<Site>) -> Self {
        self.notes.push(Note { why, site });
        self
    }
}
