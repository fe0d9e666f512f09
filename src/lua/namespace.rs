//! The Lua environment table that holds the datamodel and the protected
//! system variables.

use super::error::ScriptError;
use super::event::{data_options, LuaEventSnapshot};
use crate::binding::{
    BindingError, InPredicate, Namespace, PredicateArgument, ProtectedAccessor, SystemValue,
};
use crate::core::EventSnapshot;
use mlua::{AnyUserData, Function, Lua, LuaSerdeExt, MultiValue, Table, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Safe base functions reachable from scripts.
const BASE_FUNCTIONS: &[&str] = &[
    "tostring",
    "tonumber",
    "type",
    "pairs",
    "ipairs",
    "next",
    "select",
    "error",
    "pcall",
    "xpcall",
    "assert",
    "rawequal",
    "rawlen",
    "setmetatable",
    "getmetatable",
];

const BASE_LIBRARIES: &[&str] = &["math", "string", "table"];

/// Protected calls that must not swallow an interrupt.
const GUARDED_CALLS: &[&str] = &["pcall", "xpcall"];

/// Value returned by `getmetatable` on the environment.
const LOCKED_METATABLE: &str = "scxml: protected environment";

/// Set when an evaluation is aborted by the host, e.g. by the instruction
/// limit. While set, `pcall` and `xpcall` re-raise instead of returning.
#[derive(Debug, Default)]
pub(crate) struct Interrupt(RefCell<Option<String>>);

impl Interrupt {
    pub(crate) fn raise(&self, message: String) {
        *self.0.borrow_mut() = Some(message);
    }

    pub(crate) fn reset(&self) {
        *self.0.borrow_mut() = None;
    }

    pub(crate) fn message(&self) -> Option<String> {
        self.0.borrow().clone()
    }

    fn check(&self) -> mlua::Result<()> {
        match self.message() {
            Some(message) => Err(mlua::Error::RuntimeError(message)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct ProtectedSlots {
    accessors: RefCell<HashMap<&'static str, ProtectedAccessor>>,
    event: RefCell<Option<(EventSnapshot, AnyUserData)>>,
    in_function: RefCell<Option<Function>>,
}

impl ProtectedSlots {
    fn accessor(&self, name: &str) -> Option<ProtectedAccessor> {
        self.accessors.borrow().get(name).cloned()
    }

    fn to_lua(&self, lua: &Lua, value: SystemValue) -> mlua::Result<Value> {
        match value {
            SystemValue::Absent => Ok(Value::Nil),
            SystemValue::Text(text) => lua.create_string(&text).map(Value::String),
            SystemValue::IoProcessors(processors) => lua.to_value(&processors),
            SystemValue::Data(data) => lua.to_value_with(&data, data_options()),
            SystemValue::Event(snapshot) => self.event_userdata(lua, snapshot).map(Value::UserData),
            SystemValue::Predicate(predicate) => self.in_function(lua, predicate).map(Value::Function),
        }
    }

    /// The userdata for `snapshot`, reused while the same snapshot is current.
    fn event_userdata(&self, lua: &Lua, snapshot: EventSnapshot) -> mlua::Result<AnyUserData> {
        if let Some((cached, userdata)) = self.event.borrow().as_ref() {
            if cached.ptr_eq(&snapshot) {
                return Ok(userdata.clone());
            }
        }
        let userdata = lua.create_ser_userdata(LuaEventSnapshot::new(snapshot.clone()))?;
        *self.event.borrow_mut() = Some((snapshot, userdata.clone()));
        Ok(userdata)
    }

    fn in_function(&self, lua: &Lua, predicate: InPredicate) -> mlua::Result<Function> {
        if let Some(function) = self.in_function.borrow().as_ref() {
            return Ok(function.clone());
        }
        let function = lua.create_function(move |_, argument: Value| {
            let result = match &argument {
                Value::String(s) => match s.to_str() {
                    Ok(state_id) => predicate.call(PredicateArgument::StateId(&state_id)),
                    // Not a valid id, so never active.
                    Err(_) => Ok(false),
                },
                other => predicate.call(PredicateArgument::Other(other.type_name())),
            };
            result.map_err(mlua::Error::external)
        })?;
        *self.in_function.borrow_mut() = Some(function.clone());
        Ok(function)
    }
}

/// A Lua environment used as the SCXML datamodel namespace.
///
/// Ordinary names live in the environment table itself. Protected names are
/// never stored there: the environment's metatable routes their reads and
/// writes to the installed accessors, so a script cannot shadow them. The
/// metatable is locked and `rawset` is not reachable from scripts.
///
/// `math`, `string` and `table` are shallow copies, renewed by
/// [`reset_libraries`](Self::reset_libraries) before each evaluation.
pub struct LuaNamespace {
    lua: Lua,
    env: Table,
    base: Table,
    libraries: Vec<(&'static str, Table)>,
    slots: Rc<ProtectedSlots>,
    interrupt: Rc<Interrupt>,
}

impl LuaNamespace {
    /// Create an empty namespace in `lua`.
    pub fn new(lua: &Lua) -> mlua::Result<Self> {
        let slots = Rc::new(ProtectedSlots::default());
        let interrupt = Rc::new(Interrupt::default());
        let env = lua.create_table()?;
        let base = build_base(lua, Rc::clone(&interrupt))?;
        let libraries = load_libraries(lua)?;
        lock_string_metatable(lua)?;

        let metatable = lua.create_table()?;

        let index_slots = Rc::clone(&slots);
        let index_base = base.clone();
        let index = lua.create_function(move |lua, (_env, key): (Table, Value)| {
            if let Value::String(name) = &key {
                if let Some(accessor) = index_slots.accessor(&name.to_string_lossy()) {
                    return index_slots.to_lua(lua, accessor.read());
                }
            }
            index_base.raw_get::<Value>(key)
        })?;
        metatable.set("__index", index)?;

        let newindex_slots = Rc::clone(&slots);
        let newindex = lua.create_function(move |_, (env, key, value): (Table, Value, Value)| {
            if let Value::String(name) = &key {
                if let Some(accessor) = newindex_slots.accessor(&name.to_string_lossy()) {
                    return accessor.write().map_err(mlua::Error::external);
                }
            }
            env.raw_set(key, value)
        })?;
        metatable.set("__newindex", newindex)?;
        metatable.set("__metatable", LOCKED_METATABLE)?;

        env.set_metatable(Some(metatable));

        let namespace = Self {
            lua: lua.clone(),
            env,
            base,
            libraries,
            slots,
            interrupt,
        };
        namespace.reset_libraries()?;
        Ok(namespace)
    }

    /// Replace `math`, `string` and `table` with fresh copies of the VM's
    /// libraries, discarding whatever a previous script did to them.
    pub fn reset_libraries(&self) -> mlua::Result<()> {
        for (name, library) in &self.libraries {
            let copy = self.lua.create_table()?;
            for pair in library.pairs::<Value, Value>() {
                let (key, value) = pair?;
                copy.raw_set(key, value)?;
            }
            self.base.raw_set(*name, copy)?;
        }
        Ok(())
    }

    pub(crate) fn interrupt(&self) -> Rc<Interrupt> {
        Rc::clone(&self.interrupt)
    }

    /// The environment table to evaluate chunks in.
    pub fn env(&self) -> &Table {
        &self.env
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.slots.accessors.borrow().contains_key(name)
    }

    /// Assign a datamodel variable from the host.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Binding`] if `name` is a protected variable.
    pub fn set_data(&self, name: &str, value: &serde_json::Value) -> Result<(), ScriptError> {
        if let Some(accessor) = self.slots.accessor(name) {
            accessor.write()?;
        }
        let value = self.lua.to_value_with(value, data_options())?;
        self.env.raw_set(name, value)?;
        Ok(())
    }

    /// Read any name as JSON. Protected names resolve through their accessor.
    pub fn get_data(&self, name: &str) -> Result<serde_json::Value, ScriptError> {
        let value: Value = self.env.get(name)?;
        self.lua
            .from_value(value)
            .map_err(|err| ScriptError::Conversion(format!("{name}: {err}")))
    }
}

impl Namespace for LuaNamespace {
    fn is_bound(&self, name: &str) -> bool {
        if self.is_protected(name) {
            return true;
        }
        matches!(self.env.raw_get::<Value>(name), Ok(value) if !value.is_nil())
    }

    fn define_protected(&mut self, accessor: ProtectedAccessor) -> Result<(), BindingError> {
        let name = accessor.name();
        if self.is_bound(name) {
            return Err(BindingError::DuplicateBinding {
                names: vec![name.to_string()],
            });
        }
        self.slots.accessors.borrow_mut().insert(name, accessor);
        Ok(())
    }
}

fn build_base(lua: &Lua, interrupt: Rc<Interrupt>) -> mlua::Result<Table> {
    let base = lua.create_table()?;
    let globals = lua.globals();
    for name in BASE_FUNCTIONS {
        let val = match globals.get::<Value>(*name) {
            Ok(Value::Nil) | Err(_) => continue,
            Ok(val) => val,
        };
        match val {
            Value::Function(call) if GUARDED_CALLS.contains(name) => {
                base.set(*name, guarded_call(lua, call, Rc::clone(&interrupt))?)?;
            }
            val => base.set(*name, val)?,
        }
    }
    Ok(base)
}

/// Wrap a protected-call function so it re-raises a pending interrupt
/// instead of reporting it as a caught error.
fn guarded_call(lua: &Lua, call: Function, interrupt: Rc<Interrupt>) -> mlua::Result<Function> {
    lua.create_function(move |_, args: MultiValue| {
        interrupt.check()?;
        let results: MultiValue = call.call(args)?;
        interrupt.check()?;
        Ok(results)
    })
}

fn load_libraries(lua: &Lua) -> mlua::Result<Vec<(&'static str, Table)>> {
    let globals = lua.globals();
    let mut libraries = Vec::new();
    for name in BASE_LIBRARIES {
        if let Ok(Value::Table(library)) = globals.get::<Value>(*name) {
            libraries.push((*name, library));
        }
    }
    Ok(libraries)
}

/// `getmetatable("")` would otherwise hand scripts the VM's own `string`
/// table through `__index`.
fn lock_string_metatable(lua: &Lua) -> mlua::Result<()> {
    lua.load("local mt = getmetatable('') if type(mt) == 'table' then mt.__metatable = 'string' end")
        .set_name("=string_metatable")
        .exec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SystemContextBinding;
    use crate::context::{SystemContext, SystemContextBuilder};
    use crate::core::{EventRecord, EventType};
    use serde_json::json;

    fn bound() -> (Lua, LuaNamespace, Rc<RefCell<SystemContext>>) {
        let lua = Lua::new();
        let mut namespace = LuaNamespace::new(&lua).unwrap();
        let context = Rc::new(RefCell::new(
            SystemContextBuilder::new()
                .session_id("s1")
                .active_state("idle")
                .build()
                .unwrap(),
        ));
        SystemContextBinding::install(&mut namespace, context.clone()).unwrap();
        (lua, namespace, context)
    }

    fn eval<R: mlua::FromLuaMulti>(lua: &Lua, namespace: &LuaNamespace, source: &str) -> mlua::Result<R> {
        lua.load(source).set_environment(namespace.env().clone()).eval()
    }

    #[test]
    fn protected_names_read_through() {
        let (lua, namespace, _context) = bound();
        let sid: String = eval(&lua, &namespace, "_sessionid").unwrap();
        let name_is_nil: bool = eval(&lua, &namespace, "_name == nil").unwrap();
        let location: String = eval(&lua, &namespace, "_ioprocessors.scxml.location").unwrap();

        assert_eq!(sid, "s1");
        assert!(name_is_nil);
        assert_eq!(location, "#_scxml_s1");
    }

    #[test]
    fn data_names_behave_normally() {
        let (lua, namespace, _context) = bound();
        let total: i64 = eval(&lua, &namespace, "count = 2; count = count + 1; return count").unwrap();
        assert_eq!(total, 3);
        assert_eq!(namespace.get_data("count").unwrap(), json!(3));
    }

    #[test]
    fn base_library_is_reachable_but_unsafe_globals_are_not() {
        let (lua, namespace, _context) = bound();
        let floor: i64 = eval(&lua, &namespace, "math.floor(2.7)").unwrap();
        let hidden: bool = eval(
            &lua,
            &namespace,
            "os == nil and io == nil and load == nil and rawset == nil and rawget == nil",
        )
        .unwrap();

        assert_eq!(floor, 2);
        assert!(hidden);
    }

    #[test]
    fn metatable_is_locked() {
        let (lua, namespace, _context) = bound();
        let locked: String = eval(&lua, &namespace, "getmetatable(_ENV)").unwrap();
        assert_eq!(locked, LOCKED_METATABLE);
        assert!(eval::<()>(&lua, &namespace, "setmetatable(_ENV, nil)").is_err());
    }

    #[test]
    fn event_userdata_is_reused_per_snapshot() {
        let (lua, namespace, context) = bound();
        context
            .borrow_mut()
            .dispatch(EventRecord::new("go", EventType::Internal));

        let same: bool = eval(&lua, &namespace, "rawequal(_event, _event)").unwrap();
        assert!(same);

        eval::<()>(&lua, &namespace, "first = _event").unwrap();
        context
            .borrow_mut()
            .dispatch(EventRecord::new("go", EventType::Internal));
        let replaced: bool = eval(&lua, &namespace, "not rawequal(first, _event)").unwrap();
        assert!(replaced);
    }

    #[test]
    fn in_function_is_created_once() {
        let (lua, namespace, _context) = bound();
        let same: bool = eval(&lua, &namespace, "rawequal(In, In)").unwrap();
        let active: bool = eval(&lua, &namespace, "In('idle') and not In('nowhere') and not In('')").unwrap();

        assert!(same);
        assert!(active);
    }

    #[test]
    fn host_cannot_overwrite_protected_name() {
        let (_lua, namespace, _context) = bound();
        let err = namespace.set_data("_x", &json!({})).unwrap_err();
        assert_eq!(err.binding().and_then(BindingError::violated_name), Some("_x"));
    }

    #[test]
    fn existing_data_blocks_install() {
        let lua = Lua::new();
        let mut namespace = LuaNamespace::new(&lua).unwrap();
        namespace.set_data("_name", &json!("shadow")).unwrap();
        let context = SystemContextBuilder::new().session_id("s1").build().unwrap();

        let err = SystemContextBinding::install(&mut namespace, Rc::new(RefCell::new(context)))
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::DuplicateBinding {
                names: vec!["_name".to_string()]
            }
        );
        assert!(!namespace.is_protected("_sessionid"));
    }
}
