//! Parameter leak summaries
//!
//! A [`Leaks`] records, for one parameter, the smallest number of
//! dereferences after which its value reaches each sink. Slot layout:
//!
//! | slot | sink      |
//! |------|-----------|
//! | 0    | heap      |
//! | 1    | mutator   |
//! | 2    | callee    |
//! | 3..8 | result 0-4 |
//!
//! A slot stores `derefs + 1`; zero means "does not leak there".

use crate::errors::{EscapeGraphError, EscapeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of result positions tracked individually
pub const NUM_ESC_RESULTS: usize = 5;

const HEAP: usize = 0;
const MUTATOR: usize = 1;
const CALLEE: usize = 2;
const RESULT0: usize = 3;
const SLOTS: usize = RESULT0 + NUM_ESC_RESULTS;

const ENCODING_PREFIX: &str = "esc:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeakKind {
    Heap,
    Mutator,
    Callee,
    Result(usize),
}

/// One entry of a summary: sink plus minimal indirection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakTag {
    pub kind: LeakKind,
    pub derefs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Leaks([u8; SLOTS]);

impl Leaks {
    /// Summary of a parameter that leaks straight to the heap
    pub fn heap_leak() -> Self {
        let mut leaks = Self::default();
        leaks.add_heap(0);
        leaks
    }

    pub fn heap(&self) -> Option<u32> {
        self.get(HEAP)
    }

    pub fn mutator(&self) -> Option<u32> {
        self.get(MUTATOR)
    }

    pub fn callee(&self) -> Option<u32> {
        self.get(CALLEE)
    }

    pub fn result(&self, i: usize) -> Option<u32> {
        if i >= NUM_ESC_RESULTS {
            return None;
        }
        self.get(RESULT0 + i)
    }

    pub fn add_heap(&mut self, derefs: i32) {
        self.add(HEAP, derefs);
    }

    pub fn add_mutator(&mut self, derefs: i32) {
        self.add(MUTATOR, derefs);
    }

    pub fn add_callee(&mut self, derefs: i32) {
        self.add(CALLEE, derefs);
    }

    pub fn add_result(&mut self, i: usize, derefs: i32) {
        if i < NUM_ESC_RESULTS {
            self.add(RESULT0 + i, derefs);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Drop every tag made redundant by a heap leak at lower or equal depth
    pub fn optimize(&mut self) {
        if let Some(heap) = self.heap() {
            for slot in MUTATOR..SLOTS {
                if matches!(self.get(slot), Some(d) if d >= heap) {
                    self.0[slot] = 0;
                }
            }
        }
    }

    /// Tags in slot order
    pub fn tags(&self) -> Vec<LeakTag> {
        (0..SLOTS)
            .filter_map(|slot| {
                self.get(slot).map(|derefs| LeakTag {
                    kind: slot_kind(slot),
                    derefs,
                })
            })
            .collect()
    }

    /// Compact string form: `esc:` followed by the slots as hex bytes,
    /// trailing empty slots trimmed
    pub fn encode(&self) -> String {
        let used = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let mut out = String::with_capacity(ENCODING_PREFIX.len() + used * 2);
        out.push_str(ENCODING_PREFIX);
        for b in &self.0[..used] {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }

    pub fn decode(s: &str) -> EscapeResult<Self> {
        let hex = s
            .strip_prefix(ENCODING_PREFIX)
            .ok_or_else(|| EscapeGraphError::MalformedSummary(format!("missing prefix: {:?}", s)))?;
        if hex.len() % 2 != 0 || hex.len() / 2 > SLOTS {
            return Err(EscapeGraphError::MalformedSummary(format!(
                "bad length: {:?}",
                s
            )));
        }
        let mut slots = [0u8; SLOTS];
        for (i, slot) in slots.iter_mut().enumerate().take(hex.len() / 2) {
            let byte = hex.get(i * 2..i * 2 + 2).ok_or_else(|| {
                EscapeGraphError::MalformedSummary(format!("bad byte at {}: {:?}", i, s))
            })?;
            *slot = u8::from_str_radix(byte, 16).map_err(|_| {
                EscapeGraphError::MalformedSummary(format!("bad byte at {}: {:?}", i, s))
            })?;
        }
        Ok(Self(slots))
    }

    fn get(&self, slot: usize) -> Option<u32> {
        match self.0[slot] {
            0 => None,
            v => Some(u32::from(v) - 1),
        }
    }

    fn add(&mut self, slot: usize, derefs: i32) {
        let derefs = derefs.clamp(0, i32::from(u8::MAX) - 1) as u32;
        if self.get(slot).map_or(true, |cur| derefs < cur) {
            self.0[slot] = (derefs + 1) as u8;
        }
    }
}

fn slot_kind(slot: usize) -> LeakKind {
    match slot {
        HEAP => LeakKind::Heap,
        MUTATOR => LeakKind::Mutator,
        CALLEE => LeakKind::Callee,
        _ => LeakKind::Result(slot - RESULT0),
    }
}

impl fmt::Display for LeakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeakKind::Heap => write!(f, "heap"),
            LeakKind::Mutator => write!(f, "mutator"),
            LeakKind::Callee => write!(f, "callee"),
            LeakKind::Result(i) => write!(f, "result{}", i),
        }
    }
}

impl fmt::Display for Leaks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags = self.tags();
        if tags.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = tags
            .iter()
            .map(|t| format!("{}={}", t.kind, t.derefs))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl From<Leaks> for String {
    fn from(leaks: Leaks) -> String {
        leaks.encode()
    }
}

impl TryFrom<String> for Leaks {
    type Error = EscapeGraphError;

    fn try_from(s: String) -> EscapeResult<Self> {
        Leaks::decode(&s)
    }
}
