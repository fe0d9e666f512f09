//! Script namespaces and the protected accessors installed into them.

use super::error::{reject_write, BindingError};
use super::variable::{SystemValue, SystemVariable};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Read half of a protected variable.
pub type ReadFn = Rc<dyn Fn() -> SystemValue>;

/// Accessor pair for one protected variable.
///
/// The read path resolves against the context provider on every call. The
/// write path is the shared [`reject_write`] guard and always fails.
#[derive(Clone)]
pub struct ProtectedAccessor {
    variable: SystemVariable,
    read: ReadFn,
}

impl ProtectedAccessor {
    pub fn new<F>(variable: SystemVariable, read: F) -> Self
    where
        F: Fn() -> SystemValue + 'static,
    {
        Self {
            variable,
            read: Rc::new(read),
        }
    }

    pub fn variable(&self) -> SystemVariable {
        self.variable
    }

    pub fn name(&self) -> &'static str {
        self.variable.as_str()
    }

    /// Resolve the current value.
    pub fn read(&self) -> SystemValue {
        (self.read)()
    }

    /// Attempt a write. Always fails with
    /// [`BindingError::ProtectedVariableViolation`].
    pub fn write(&self) -> Result<(), BindingError> {
        reject_write(self.name())
    }
}

impl fmt::Debug for ProtectedAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedAccessor")
            .field("variable", &self.variable)
            .finish_non_exhaustive()
    }
}

/// A script-evaluation namespace a host engine exposes to the binding.
///
/// Implementations must refuse to redefine a name that is already bound,
/// whether by an earlier protected definition or by ordinary script data.
pub trait Namespace {
    /// Whether `name` currently resolves to anything in this namespace.
    fn is_bound(&self, name: &str) -> bool;

    /// Install a protected accessor under its variable's name.
    ///
    /// # Errors
    ///
    /// [`BindingError::DuplicateBinding`] if the name is already bound.
    fn define_protected(&mut self, accessor: ProtectedAccessor) -> Result<(), BindingError>;
}

/// Value read from a [`SimpleNamespace`].
#[derive(Clone, Debug)]
pub enum NamespaceValue {
    /// Ordinary datamodel value written by the host or a script.
    Data(serde_json::Value),
    /// Value of a protected system variable.
    System(SystemValue),
}

#[derive(Clone, Debug)]
enum Slot {
    Data(serde_json::Value),
    Protected(ProtectedAccessor),
}

/// Host-agnostic in-memory namespace.
///
/// Holds plain datamodel values next to protected slots. Writes to a
/// protected slot go through the accessor's guard and fail.
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::binding::{NamespaceValue, SimpleNamespace, SystemContextBinding};
/// use scxml_sysvars::context::SystemContextBuilder;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let context = SystemContextBuilder::new().session_id("s1").build().unwrap();
/// let mut namespace = SimpleNamespace::new();
/// SystemContextBinding::install(&mut namespace, Rc::new(RefCell::new(context))).unwrap();
///
/// match namespace.get("_sessionid") {
///     Some(NamespaceValue::System(value)) => assert_eq!(value.as_text(), Some("s1")),
///     other => panic!("unexpected {other:?}"),
/// }
/// assert!(namespace.set("_sessionid", serde_json::json!("forged")).is_err());
/// ```
#[derive(Debug, Default)]
pub struct SimpleNamespace {
    slots: HashMap<String, Slot>,
}

impl SimpleNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name`. Protected names read through to the provider.
    pub fn get(&self, name: &str) -> Option<NamespaceValue> {
        self.slots.get(name).map(|slot| match slot {
            Slot::Data(value) => NamespaceValue::Data(value.clone()),
            Slot::Protected(accessor) => NamespaceValue::System(accessor.read()),
        })
    }

    /// Assign a datamodel value.
    ///
    /// # Errors
    ///
    /// [`BindingError::ProtectedVariableViolation`] when `name` is a
    /// protected slot; the slot is left untouched.
    pub fn set(&mut self, name: &str, value: serde_json::Value) -> Result<(), BindingError> {
        match self.slots.get(name) {
            Some(Slot::Protected(accessor)) => accessor.write(),
            _ => {
                self.slots.insert(name.to_string(), Slot::Data(value));
                Ok(())
            }
        }
    }

    /// Every bound name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_protected(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Protected(_)))
    }
}

impl Namespace for SimpleNamespace {
    fn is_bound(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    fn define_protected(&mut self, accessor: ProtectedAccessor) -> Result<(), BindingError> {
        let name = accessor.name();
        if self.slots.contains_key(name) {
            return Err(BindingError::DuplicateBinding {
                names: vec![name.to_string()],
            });
        }
        self.slots.insert(name.to_string(), Slot::Protected(accessor));
        Ok(())
    }
}
