//! `_event` as Lua userdata.

use crate::binding::reject_write;
use crate::core::{EventField, EventSnapshot, FieldValue};
use mlua::{Lua, LuaSerdeExt, MetaMethod, SerializeOptions, UserData, UserDataMethods, Value};
use serde::Serialize;

/// Conversion options for datamodel values: JSON `null` becomes `nil`.
pub(crate) fn data_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

/// Read-only view of an [`EventSnapshot`] inside Lua.
///
/// Indexing exposes the seven event fields; anything else is `nil`. Any
/// assignment raises a protected-variable violation naming `_event.<key>`.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct LuaEventSnapshot(EventSnapshot);

impl LuaEventSnapshot {
    pub fn new(snapshot: EventSnapshot) -> Self {
        Self(snapshot)
    }

    pub fn snapshot(&self) -> &EventSnapshot {
        &self.0
    }
}

fn field_to_lua(lua: &Lua, value: FieldValue<'_>) -> mlua::Result<Value> {
    match value {
        FieldValue::Text(text) => lua.create_string(text).map(Value::String),
        FieldValue::Data(data) => lua.to_value_with(data, data_options()),
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.to_string_lossy().to_string(),
        Value::Integer(i) => i.to_string(),
        other => other.type_name().to_string(),
    }
}

impl UserData for LuaEventSnapshot {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            let Value::String(key) = key else {
                return Ok(Value::Nil);
            };
            let key = key.to_str()?;
            match this.0.get(&key) {
                Some(value) => field_to_lua(lua, value),
                None => Ok(Value::Nil),
            }
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, _this, (key, _value): (Value, Value)| {
                reject_write(&format!("_event.{}", key_name(&key))).map_err(mlua::Error::external)
            },
        );

        // Iterates over a detached copy, so the snapshot stays frozen.
        methods.add_meta_method(MetaMethod::Pairs, |lua, this, ()| {
            let fields = lua.create_table()?;
            for field in EventField::ALL {
                if let Some(value) = this.0.field(field) {
                    fields.raw_set(field.script_name(), field_to_lua(lua, value)?)?;
                }
            }
            let next: mlua::Function = lua.globals().get("next")?;
            Ok((next, fields, Value::Nil))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("event: {}", this.0.name().unwrap_or("<unnamed>")))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingError;
    use crate::core::{EventRecord, EventType};
    use serde_json::json;

    fn lua_with_event() -> Lua {
        let lua = Lua::new();
        let record = EventRecord::new("order.placed", EventType::External)
            .with_send_id("send-1")
            .with_data(json!({ "total": 12, "items": ["a", "b"] }));
        let event = lua
            .create_ser_userdata(LuaEventSnapshot::new(EventSnapshot::from_record(&record)))
            .unwrap();
        lua.globals().set("ev", event).unwrap();
        lua
    }

    #[test]
    fn fields_are_readable() {
        let lua = lua_with_event();
        let name: String = lua.load("ev.name").eval().unwrap();
        let kind: String = lua.load("ev.type").eval().unwrap();
        let total: i64 = lua.load("ev.data.total").eval().unwrap();
        let second: String = lua.load("ev.data.items[2]").eval().unwrap();

        assert_eq!(name, "order.placed");
        assert_eq!(kind, "external");
        assert_eq!(total, 12);
        assert_eq!(second, "b");
    }

    #[test]
    fn unset_and_unknown_fields_are_nil() {
        let lua = lua_with_event();
        let missing: bool = lua
            .load("ev.invokeid == nil and ev.origin == nil and ev.bogus == nil and ev[1] == nil")
            .eval()
            .unwrap();
        assert!(missing);
    }

    #[test]
    fn field_writes_raise_typed_violation() {
        let lua = lua_with_event();
        let err = lua.load("ev.name = 'forged'").exec().unwrap_err();

        let script_err = crate::lua::ScriptError::from_evaluation("ev.name = 'forged'", err);
        assert_eq!(
            script_err.binding(),
            Some(&BindingError::ProtectedVariableViolation {
                name: "_event.name".to_string()
            })
        );

        let name: String = lua.load("ev.name").eval().unwrap();
        assert_eq!(name, "order.placed");
    }

    #[test]
    fn nested_data_mutation_does_not_leak_into_snapshot() {
        let lua = lua_with_event();
        lua.load("local d = ev.data; d.total = 99").exec().unwrap();
        let total: i64 = lua.load("ev.data.total").eval().unwrap();
        assert_eq!(total, 12);
    }

    #[test]
    fn pairs_lists_present_fields() {
        let lua = lua_with_event();
        let count: i64 = lua
            .load("local n = 0; for _ in pairs(ev) do n = n + 1 end; return n")
            .eval()
            .unwrap();
        // name, type, sendid, data
        assert_eq!(count, 4);
    }

    #[test]
    fn tostring_shows_event_name() {
        let lua = lua_with_event();
        let text: String = lua.load("tostring(ev)").eval().unwrap();
        assert_eq!(text, "event: order.placed");
    }
}
