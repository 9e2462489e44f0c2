//! Heap payloads: strings, buffers, arrays, objects, and the
//! manually-freed set behind the `free` builtin.

use crate::types::TypeValue;
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

/// Initial element capacity of freshly allocated arrays.
pub const ARRAY_INITIAL_CAPACITY: usize = 8;

/// Mutable UTF-8 string payload.
///
/// The codepoint count is computed lazily and cached; mutation
/// invalidates the cache. Byte length is always `data.len()`.
#[derive(Debug, Clone)]
pub struct Str {
    pub data: String,
    /// Cached codepoint count, -1 until first request.
    chars_cached: isize,
}

impl Str {
    pub fn new(data: String) -> Self {
        Self {
            data,
            chars_cached: -1,
        }
    }

    /// Codepoint count (not byte length), cached after first call.
    pub fn char_count(&mut self) -> usize {
        if self.chars_cached < 0 {
            self.chars_cached = self.data.chars().count() as isize;
        }
        self.chars_cached as usize
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Replace the contents, invalidating the cached codepoint count.
    pub fn replace_data(&mut self, data: String) {
        self.data = data;
        self.chars_cached = -1;
    }
}

/// Mutable byte block with bounds-checked indexed access. Distinct from
/// `ptr`, which is unchecked.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub data: Vec<u8>,
}

impl Buffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    pub fn set(&mut self, index: usize, byte: u8) -> bool {
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }
}

/// Dynamic value sequence with an optional element-type constraint.
///
/// When the constraint is set, insertions that do not satisfy it are
/// rejected by the caller (typed-array violation). Growth policy is the
/// doubling one, seeded at [`ARRAY_INITIAL_CAPACITY`].
#[derive(Debug, Clone)]
pub struct Array {
    pub elements: Vec<Value>,
    pub elem_type: Option<TypeValue>,
}

impl Array {
    pub fn new(elements: Vec<Value>) -> Self {
        let mut storage = Vec::with_capacity(ARRAY_INITIAL_CAPACITY.max(elements.len()));
        storage.extend(elements);
        Self {
            elements: storage,
            elem_type: None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Insertion-ordered field map with unique names and an optional
/// duck-type name set after validation.
#[derive(Debug, Default)]
pub struct Object {
    fields: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
    pub type_name: Option<String>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    /// Insert a new field or update an existing one, preserving the
    /// original insertion position on update.
    pub fn set(&mut self, name: String, value: Value) {
        match self.index.get(&name) {
            Some(&i) => self.fields[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push((name, value));
            }
        }
    }

    /// Fields in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &(String, Value)> {
        self.fields.iter()
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.index.clear();
        self.type_name = None;
    }
}

// ── Manually-freed set ──────────────────────────────────────────────
//
// Heap values released via the `free` builtin are recorded here so the
// release path does not double-free them. The set is process-wide and
// scoped to a program run.

static MANUALLY_FREED: Lazy<Mutex<FxHashSet<usize>>> =
    Lazy::new(|| Mutex::new(FxHashSet::default()));

/// Record a payload address as freed. Returns false when the address was
/// already recorded (a second `free` is a no-op, not a double release).
pub fn mark_freed(addr: usize) -> bool {
    MANUALLY_FREED.lock().insert(addr)
}

pub fn is_freed(addr: usize) -> bool {
    MANUALLY_FREED.lock().contains(&addr)
}
