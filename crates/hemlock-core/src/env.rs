//! Lexically nested name→value bindings.
//!
//! An environment is an owned cell with interior mutability behind a
//! reference-counted handle: closures capture the handle, so sibling
//! closures created in one scope observe each other's mutations.

use std::sync::Arc;

use crate::value::Value;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub type EnvRef = Arc<Mutex<Env>>;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

/// One lexical frame: local bindings plus an optional parent.
#[derive(Debug, Default)]
pub struct Env {
    vars: FxHashMap<String, Binding>,
    parent: Option<EnvRef>,
}

/// Failure mode of [`Env::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetError {
    /// No binding with that name exists anywhere on the chain.
    NotFound,
    /// The nearest binding is a `const`.
    Constant,
}

impl Env {
    /// Fresh root environment (no parent).
    pub fn root() -> EnvRef {
        Arc::new(Mutex::new(Env::default()))
    }

    /// New frame chained to `parent`.
    pub fn child(parent: &EnvRef) -> EnvRef {
        Arc::new(Mutex::new(Env {
            vars: FxHashMap::default(),
            parent: Some(parent.clone()),
        }))
    }

    /// Look a name up, walking the parent chain.
    ///
    /// Locks one frame at a time so concurrent lookups through shared
    /// closure environments cannot deadlock.
    pub fn get(env: &EnvRef, name: &str) -> Option<Value> {
        let mut current = env.clone();
        loop {
            let next = {
                let guard = current.lock();
                if let Some(binding) = guard.vars.get(name) {
                    return Some(binding.value.clone());
                }
                guard.parent.clone()
            };
            current = next?;
        }
    }

    /// Mutate the nearest existing binding; errors if none exists or the
    /// binding is constant. Assignment never creates bindings.
    pub fn set(env: &EnvRef, name: &str, value: Value) -> Result<(), SetError> {
        let mut current = env.clone();
        loop {
            let next = {
                let mut guard = current.lock();
                if let Some(binding) = guard.vars.get_mut(name) {
                    if binding.constant {
                        return Err(SetError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
                guard.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(SetError::NotFound),
            }
        }
    }

    /// Unconditionally insert into the current frame, shadowing any
    /// binding of the same name in outer frames.
    pub fn define(env: &EnvRef, name: impl Into<String>, value: Value, constant: bool) {
        env.lock().vars.insert(
            name.into(),
            Binding { value, constant },
        );
    }

    /// True when the current frame (not the chain) holds the name.
    pub fn has_local(env: &EnvRef, name: &str) -> bool {
        env.lock().vars.contains_key(name)
    }
}
