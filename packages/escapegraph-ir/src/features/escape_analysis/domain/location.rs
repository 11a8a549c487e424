//! Location graph vertices
//!
//! Every declared identifier, parameter, result slot and allocation site of a
//! batch owns exactly one [`Location`]. Locations live in a [`LocationArena`]
//! and reference each other through [`LocationId`] handles; incoming edges are
//! stored on the destination.

use crate::features::ir::{FuncId, Site};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign, Index, IndexMut};

use super::leaks::Leaks;

/// Arena handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub u32);

impl LocationId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Location attribute bitset
///
/// Encoded as bit flags for compact storage:
/// - Bit 0: Escapes (must be heap allocated)
/// - Bit 1: Persists (outlives the statement that created it)
/// - Bit 2: Mutates (reachable memory may be written through an alias)
/// - Bit 3: Calls (a reachable closure may be called indirectly)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocAttrs(pub u8);

impl LocAttrs {
    pub const NONE: LocAttrs = LocAttrs(0);
    pub const ESCAPES: LocAttrs = LocAttrs(1 << 0);
    pub const PERSISTS: LocAttrs = LocAttrs(1 << 1);
    pub const MUTATES: LocAttrs = LocAttrs(1 << 2);
    pub const CALLS: LocAttrs = LocAttrs(1 << 3);
    pub const ALL: LocAttrs = LocAttrs(0b1111);

    #[inline]
    pub fn contains(self, other: LocAttrs) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersection(self, other: LocAttrs) -> LocAttrs {
        LocAttrs(self.0 & other.0)
    }

    /// Bits of `self` not present in `other`
    #[inline]
    pub fn difference(self, other: LocAttrs) -> LocAttrs {
        LocAttrs(self.0 & !other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn escapes(self) -> bool {
        self.contains(Self::ESCAPES)
    }

    pub fn persists(self) -> bool {
        self.contains(Self::PERSISTS)
    }

    pub fn mutates(self) -> bool {
        self.contains(Self::MUTATES)
    }

    pub fn calls(self) -> bool {
        self.contains(Self::CALLS)
    }
}

impl BitOr for LocAttrs {
    type Output = LocAttrs;

    fn bitor(self, rhs: LocAttrs) -> LocAttrs {
        LocAttrs(self.0 | rhs.0)
    }
}

impl BitOrAssign for LocAttrs {
    fn bitor_assign(&mut self, rhs: LocAttrs) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for LocAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::ESCAPES, "escapes"),
            (Self::PERSISTS, "persists"),
            (Self::MUTATES, "mutates"),
            (Self::CALLS, "calls"),
        ]
        .iter()
        .filter(|(bit, _)| self.contains(*bit))
        .map(|(_, name)| *name)
        .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Diagnostic annotation carried along a flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub why: &'static str,
    pub site: Option<Site>,
}

/// Incoming flow `src -> (owner)` with signed indirection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: LocationId,
    pub derefs: i32,
    pub notes: Vec<Note>,
}

/// One hop of a recorded flow path, resolved to text by the emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowHop {
    pub dst: LocationId,
    pub src: LocationId,
    pub derefs: i32,
    pub notes: Vec<Note>,
}

/// Synthetic locations with no owning IR node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthetic {
    Heap,
    Mutator,
    Callee,
    /// Tee or deferred-call temporary
    Temp,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub site: Option<Site>,
    pub synthetic: Option<Synthetic>,
    pub func: Option<FuncId>,
    pub loop_depth: u32,
    /// 1-based index in the result tuple, 0 when not a result slot
    pub result_index: usize,
    pub attrs: LocAttrs,

    pub is_param: bool,
    pub is_result: bool,
    pub is_global: bool,
    pub captured: bool,
    pub reassigned: bool,
    pub addrtaken: bool,

    pub edges: Vec<Edge>,
    pub leaks: Leaks,

    // solver state
    pub(crate) derefs: i32,
    pub(crate) walkgen: u32,
    pub(crate) dst: Option<LocationId>,
    pub(crate) dst_edge: usize,
    pub(crate) queued: bool,
    pub(crate) walk_queued: bool,
}

impl Location {
    pub fn new(site: Option<Site>, func: Option<FuncId>, loop_depth: u32) -> Self {
        Self {
            site,
            synthetic: None,
            func,
            loop_depth,
            result_index: 0,
            attrs: LocAttrs::NONE,
            is_param: false,
            is_result: false,
            is_global: false,
            captured: false,
            reassigned: false,
            addrtaken: false,
            edges: Vec::new(),
            leaks: Leaks::default(),
            derefs: 0,
            walkgen: 0,
            dst: None,
            dst_edge: 0,
            queued: false,
            walk_queued: false,
        }
    }

    fn synthetic(kind: Synthetic, attrs: LocAttrs) -> Self {
        let mut loc = Self::new(None, None, 0);
        loc.synthetic = Some(kind);
        loc.attrs = attrs;
        loc
    }

    pub fn escapes(&self) -> bool {
        self.attrs.escapes()
    }
}

/// Owner of all locations of one batch
#[derive(Debug, Clone)]
pub struct LocationArena {
    locs: Vec<Location>,
}

impl LocationArena {
    pub const HEAP: LocationId = LocationId(0);
    pub const MUTATOR: LocationId = LocationId(1);
    pub const CALLEE: LocationId = LocationId(2);

    /// Arena holding only the three sinks
    pub fn new() -> Self {
        Self {
            locs: vec![
                Location::synthetic(Synthetic::Heap, LocAttrs::ALL),
                Location::synthetic(Synthetic::Mutator, LocAttrs::MUTATES),
                Location::synthetic(Synthetic::Callee, LocAttrs::CALLS),
            ],
        }
    }

    pub fn alloc(&mut self, loc: Location) -> LocationId {
        let id = LocationId(self.locs.len() as u32);
        self.locs.push(loc);
        id
    }

    /// Unowned temporary inside `func`
    pub fn alloc_temp(&mut self, func: Option<FuncId>, loop_depth: u32, persists: bool) -> LocationId {
        let mut loc = Location::new(None, func, loop_depth);
        loc.synthetic = Some(Synthetic::Temp);
        if persists {
            loc.attrs = LocAttrs::PERSISTS;
        }
        self.alloc(loc)
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locs.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.locs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = LocationId> {
        (0..self.locs.len() as u32).map(LocationId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocationId, &Location)> + '_ {
        self.locs
            .iter()
            .enumerate()
            .map(|(i, l)| (LocationId(i as u32), l))
    }

    pub fn edge_count(&self) -> usize {
        self.locs.iter().map(|l| l.edges.len()).sum()
    }

    pub fn is_sink(id: LocationId) -> bool {
        id == Self::HEAP || id == Self::MUTATOR || id == Self::CALLEE
    }
}

impl Default for LocationArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<LocationId> for LocationArena {
    type Output = Location;

    fn index(&self, id: LocationId) -> &Location {
        &self.locs[id.index()]
    }
}

impl IndexMut<LocationId> for LocationArena {
    fn index_mut(&mut self, id: LocationId) -> &mut Location {
        &mut self.locs[id.index()]
    }
}
