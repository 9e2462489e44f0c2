//! The boundary a precompiled frontend links against.
//!
//! Compiled function values carry a native pointer and, for closures, a
//! slot environment addressed by index instead of by name. Both forms
//! are invoked through the same call path as interpreted functions
//! ([`crate::interp::call_function`]).

use std::sync::Arc;

use crate::context::{throw_msg, Exec};
use crate::value::Value;
use parking_lot::Mutex;

/// Highest argument count accepted by native function bodies, matching
/// the fixed-arity dispatch of the compiled calling convention.
pub const MAX_NATIVE_ARGS: usize = 5;

pub type ClosureEnvRef = Arc<ClosureEnv>;

/// Captured-variable vector for compiled closures, accessed by index.
pub struct ClosureEnv {
    slots: Mutex<Vec<Value>>,
}

impl ClosureEnv {
    pub fn new(len: usize) -> ClosureEnvRef {
        Arc::new(Self {
            slots: Mutex::new(vec![Value::Null; len]),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Exec<Value> {
        match self.slots.lock().get(index) {
            Some(v) => Ok(v.clone()),
            None => throw_msg(format!("closure slot {} out of range", index)),
        }
    }

    pub fn set(&self, index: usize, value: Value) -> Exec<()> {
        match self.slots.lock().get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => throw_msg(format!("closure slot {} out of range", index)),
        }
    }
}
