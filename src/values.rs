//! Parsed raw values and instance reconstruction.
//!
//! The engine fills one flat mapping from destination name to coerced
//! value; sub-command destinations are merged in under a path prefix
//! (`install.package`) so parent and child fields never collide. A schema
//! class rebuilds itself by *taking* its values out of the mapping, entering
//! the chosen sub-command's scope where it has one.

use std::any::Any;
use std::collections::HashMap;

use crate::{Error, Result};

macro_rules! format_err {
    ($($tt:tt)*) => {
        Error::new(format!($($tt)*))
    };
}

enum Slot {
    One(Box<dyn Any>),
    Many(Vec<Box<dyn Any>>),
    Picked(String),
}

/// The flat mapping of parsed raw values for one invocation.
#[derive(Default)]
pub struct Values {
    slots: HashMap<String, Slot>,
    scope: String,
}

impl Values {
    pub(crate) fn new() -> Values {
        Values::default()
    }

    pub(crate) fn store_one(&mut self, key: String, value: Box<dyn Any>) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, Slot::One(value));
        true
    }

    pub(crate) fn append(&mut self, key: String, value: Box<dyn Any>) {
        match self.slots.entry(key).or_insert_with(|| Slot::Many(Vec::new())) {
            Slot::Many(values) => values.push(value),
            _ => unreachable!(),
        }
    }

    pub(crate) fn pick(&mut self, key: String, name: String) {
        self.slots.insert(key, Slot::Picked(name));
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    fn key(&self, dest: &str) -> String {
        format!("{}{dest}", self.scope)
    }

    /// Takes a required value. The engine has already enforced
    /// required-ness, so a miss here means the schema and the parser
    /// configuration disagree.
    pub fn take<T: Any>(&mut self, dest: &str) -> Result<T> {
        match self.take_opt(dest)? {
            Some(value) => Ok(value),
            None => Err(format_err!("missing value for `{dest}`")),
        }
    }

    /// Takes an optional value; absence on the command line yields `None`.
    pub fn take_opt<T: Any>(&mut self, dest: &str) -> Result<Option<T>> {
        let key = self.key(dest);
        match self.slots.remove(&key) {
            None => Ok(None),
            Some(Slot::One(value)) => match value.downcast::<T>() {
                Ok(value) => Ok(Some(*value)),
                Err(_) => Err(self.mismatch(dest)),
            },
            Some(_) => Err(self.mismatch(dest)),
        }
    }

    /// Takes the values of a repeated argument, in input order. Zero
    /// occurrences and no default yield the empty vector.
    pub fn take_list<T: Any>(&mut self, dest: &str) -> Result<Vec<T>> {
        let key = self.key(dest);
        match self.slots.remove(&key) {
            None => Ok(Vec::new()),
            Some(Slot::One(value)) => match value.downcast::<Vec<T>>() {
                Ok(values) => Ok(*values),
                Err(_) => Err(self.mismatch(dest)),
            },
            Some(Slot::Many(values)) => {
                let mut res = Vec::with_capacity(values.len());
                for value in values {
                    match value.downcast::<T>() {
                        Ok(value) => res.push(*value),
                        Err(_) => return Err(self.mismatch(dest)),
                    }
                }
                Ok(res)
            }
            Some(Slot::Picked(_)) => Err(self.mismatch(dest)),
        }
    }

    /// The sub-command chosen for a required union field.
    pub fn command(&mut self, dest: &str) -> Result<String> {
        match self.command_opt(dest)? {
            Some(name) => Ok(name),
            None => Err(format_err!("A sub-command is required. Use `--help` for more information")),
        }
    }

    /// The sub-command chosen for an optional union field, if any.
    pub fn command_opt(&mut self, dest: &str) -> Result<Option<String>> {
        let key = self.key(dest);
        match self.slots.remove(&key) {
            None => Ok(None),
            Some(Slot::Picked(name)) => Ok(Some(name)),
            Some(_) => Err(self.mismatch(dest)),
        }
    }

    /// Enters the value scope of a chosen sub-command.
    pub fn enter(&mut self, name: &str) {
        self.scope.push_str(name);
        self.scope.push('.');
    }

    /// Leaves the innermost sub-command scope.
    pub fn leave(&mut self) {
        debug_assert!(self.scope.ends_with('.'));
        self.scope.pop();
        match self.scope.rfind('.') {
            Some(dot) => self.scope.truncate(dot + 1),
            None => self.scope.clear(),
        }
    }

    /// A dispatch name the schema does not recognize; only reachable when a
    /// hand-written `Schema` impl and its spec disagree.
    pub fn bad_command(&self, dest: &str, name: &str) -> Error {
        format_err!("no schema class registered for `{name}` in `{dest}`")
    }

    fn mismatch(&self, dest: &str) -> Error {
        format_err!("value for `{dest}` does not have the registered type")
    }
}
