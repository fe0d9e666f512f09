//! Lua evaluator for the SCXML datamodel.

use super::error::ScriptError;
use super::namespace::LuaNamespace;
use crate::binding::SystemContextBinding;
use crate::core::ContextProvider;
use mlua::{Chunk, HookTriggers, Lua, LuaSerdeExt, Value};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Evaluator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Lua instructions allowed per evaluation. `None` disables the limit;
    /// `Some(0)` is rejected by [`validate`](Self::validate).
    pub instruction_limit: Option<u32>,
    /// Chunk name shown in Lua error messages.
    pub chunk_name: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            instruction_limit: Some(1_000_000),
            chunk_name: "=scxml".to_string(),
        }
    }
}

impl EvaluatorConfig {
    pub fn with_instruction_limit(mut self, limit: Option<u32>) -> Self {
        self.instruction_limit = limit;
        self
    }

    pub fn with_chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = name.into();
        self
    }

    /// Check the settings before an evaluator is built.
    ///
    /// # Errors
    ///
    /// [`ScriptError::InvalidConfig`] for a zero instruction limit, which
    /// the Lua count hook would treat as no limit at all.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.instruction_limit == Some(0) {
            return Err(ScriptError::InvalidConfig(
                "instruction_limit must be greater than zero. Use None to disable the limit"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Evaluates SCXML expressions, conditions, assignments and scripts in a
/// single Lua datamodel.
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::context::SystemContextBuilder;
/// use scxml_sysvars::core::{EventRecord, EventType};
/// use scxml_sysvars::lua::LuaEvaluator;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let context = Rc::new(RefCell::new(
///     SystemContextBuilder::new().session_id("s1").active_state("idle").build().unwrap(),
/// ));
/// let mut evaluator = LuaEvaluator::new().unwrap();
/// evaluator.bind_system_context(context.clone()).unwrap();
///
/// context.borrow_mut().dispatch(EventRecord::new("go", EventType::Internal));
///
/// assert!(evaluator.eval_cond("_event.name == 'go' and In('idle')").unwrap());
/// assert!(evaluator.eval_assign("_sessionid", &serde_json::json!("forged")).is_err());
/// ```
pub struct LuaEvaluator {
    lua: Lua,
    namespace: LuaNamespace,
    config: EvaluatorConfig,
}

impl LuaEvaluator {
    pub fn new() -> Result<Self, ScriptError> {
        Self::with_config(EvaluatorConfig::default())
    }

    pub fn with_config(config: EvaluatorConfig) -> Result<Self, ScriptError> {
        config.validate()?;
        let lua = Lua::new();
        let namespace = LuaNamespace::new(&lua)?;
        Ok(Self {
            lua,
            namespace,
            config,
        })
    }

    /// Datamodel name this evaluator implements.
    pub fn supported_datamodel(&self) -> &'static str {
        "lua"
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn namespace(&self) -> &LuaNamespace {
        &self.namespace
    }

    /// Install the protected system variables backed by `provider`.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Binding`] with `DuplicateBinding` if a system name is
    /// already bound, including on a second call.
    pub fn bind_system_context(&mut self, provider: Rc<dyn ContextProvider>) -> Result<(), ScriptError> {
        SystemContextBinding::install(&mut self.namespace, provider)?;
        Ok(())
    }

    /// Evaluate an expression and convert the result to JSON.
    pub fn eval(&self, expression: &str) -> Result<serde_json::Value, ScriptError> {
        let value: Value = self.run(expression, |chunk| chunk.eval())?;
        self.to_json(expression, value)
    }

    /// Evaluate a condition with Lua truthiness: only `nil` and `false` are
    /// false.
    pub fn eval_cond(&self, expression: &str) -> Result<bool, ScriptError> {
        let value: Value = self.run(expression, |chunk| chunk.eval())?;
        Ok(!matches!(value, Value::Nil | Value::Boolean(false)))
    }

    /// Assign `data` to the location expression `location`, e.g. `counter`
    /// or `order.total`.
    pub fn eval_assign(&self, location: &str, data: &serde_json::Value) -> Result<(), ScriptError> {
        let value = self.lua.to_value_with(data, super::event::data_options())?;
        let source = format!("{location} = ...");
        self.run(&source, |chunk| chunk.call(value))
    }

    /// Run a script block. Returns what the block returns, or `null`.
    pub fn eval_script(&self, script: &str) -> Result<serde_json::Value, ScriptError> {
        let value: Value = self.run(script, |chunk| chunk.eval())?;
        self.to_json(script, value)
    }

    /// Initialize a datamodel variable from the host.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Binding`] if `id` names a protected system variable.
    pub fn inject_data(&self, id: &str, data: &serde_json::Value) -> Result<(), ScriptError> {
        tracing::debug!(id, "injecting datamodel value");
        self.namespace.set_data(id, data)
    }

    /// Read a datamodel variable back as JSON. Unset names are `null`.
    pub fn data(&self, id: &str) -> Result<serde_json::Value, ScriptError> {
        self.namespace.get_data(id)
    }

    fn run<R>(
        &self,
        source: &str,
        execute: impl FnOnce(Chunk<'_>) -> mlua::Result<R>,
    ) -> Result<R, ScriptError> {
        tracing::trace!(source, "evaluating");
        let interrupt = self.namespace.interrupt();
        interrupt.reset();
        self.namespace.reset_libraries()?;

        let chunk = self
            .lua
            .load(source)
            .set_name(self.config.chunk_name.as_str())
            .set_environment(self.namespace.env().clone());

        if let Some(limit) = self.config.instruction_limit {
            let hook_interrupt = Rc::clone(&interrupt);
            self.lua.set_hook(
                HookTriggers::new().every_nth_instruction(limit),
                move |_lua, _debug| {
                    let message = format!("instruction limit exceeded ({limit})");
                    hook_interrupt.raise(message.clone());
                    Err(mlua::Error::RuntimeError(message))
                },
            );
        }

        let result = execute(chunk);

        if self.config.instruction_limit.is_some() {
            self.lua.remove_hook();
        }

        // An interrupt wins over whatever the script made of it.
        if let Some(message) = interrupt.message() {
            interrupt.reset();
            tracing::debug!(source, %message, "evaluation interrupted");
            return Err(ScriptError::Evaluation {
                expression: source.to_string(),
                message,
            });
        }

        result.map_err(|err| {
            let err = ScriptError::from_evaluation(source, err);
            tracing::debug!(error = %err, "evaluation failed");
            err
        })
    }

    fn to_json(&self, source: &str, value: Value) -> Result<serde_json::Value, ScriptError> {
        self.lua
            .from_value(value)
            .map_err(|err| ScriptError::Conversion(format!("eval('{source}'): {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingError;
    use crate::context::{SystemContext, SystemContextBuilder};
    use crate::core::{EventRecord, EventType};
    use serde_json::json;
    use std::cell::RefCell;

    fn bound() -> (LuaEvaluator, Rc<RefCell<SystemContext>>) {
        let context = Rc::new(RefCell::new(
            SystemContextBuilder::new()
                .name("orders")
                .session_id("s1")
                .active_state("idle")
                .build()
                .unwrap(),
        ));
        let mut evaluator = LuaEvaluator::new().unwrap();
        evaluator.bind_system_context(context.clone()).unwrap();
        (evaluator, context)
    }

    #[test]
    fn default_config() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.instruction_limit, Some(1_000_000));
        assert_eq!(config.chunk_name, "=scxml");

        let partial: EvaluatorConfig = serde_json::from_str(r#"{ "chunk_name": "=test" }"#).unwrap();
        assert_eq!(partial.instruction_limit, Some(1_000_000));
        assert_eq!(partial.chunk_name, "=test");
    }

    #[test]
    fn eval_returns_json() {
        let (evaluator, _context) = bound();
        assert_eq!(evaluator.supported_datamodel(), "lua");
        assert_eq!(evaluator.eval("_name").unwrap(), json!("orders"));
        assert_eq!(evaluator.eval("1 + 2").unwrap(), json!(3));
        assert_eq!(evaluator.eval("_event").unwrap(), json!(null));
    }

    #[test]
    fn eval_cond_uses_lua_truthiness() {
        let (evaluator, _context) = bound();
        assert!(evaluator.eval_cond("In('idle')").unwrap());
        assert!(evaluator.eval_cond("0").unwrap());
        assert!(!evaluator.eval_cond("nil").unwrap());
        assert!(!evaluator.eval_cond("_event ~= nil").unwrap());
    }

    #[test]
    fn eval_serializes_event_snapshot() {
        let (evaluator, context) = bound();
        context.borrow_mut().dispatch(
            EventRecord::new("order.placed", EventType::External).with_data(json!({ "total": 5 })),
        );

        let event = evaluator.eval("_event").unwrap();
        assert_eq!(event["name"], json!("order.placed"));
        assert_eq!(event["type"], json!("external"));
        assert_eq!(event["data"]["total"], json!(5));
    }

    #[test]
    fn assign_and_inject_data() {
        let (evaluator, _context) = bound();
        evaluator.inject_data("order", &json!({ "total": 1 })).unwrap();
        evaluator.eval_assign("order.total", &json!(7)).unwrap();
        evaluator.eval_assign("status", &json!("open")).unwrap();

        assert_eq!(evaluator.data("order").unwrap(), json!({ "total": 7 }));
        assert_eq!(evaluator.data("status").unwrap(), json!("open"));
        assert_eq!(evaluator.data("missing").unwrap(), json!(null));
    }

    #[test]
    fn protected_assignments_fail_typed() {
        let (evaluator, context) = bound();

        let err = evaluator.eval_assign("_sessionid", &json!("forged")).unwrap_err();
        assert_eq!(err.binding().and_then(BindingError::violated_name), Some("_sessionid"));

        let err = evaluator.inject_data("In", &json!(true)).unwrap_err();
        assert_eq!(err.binding().and_then(BindingError::violated_name), Some("In"));

        assert_eq!(context.borrow().session_id_str(), "s1");
        assert_eq!(evaluator.eval("_sessionid").unwrap(), json!("s1"));
    }

    #[test]
    fn script_errors_carry_the_expression() {
        let (evaluator, _context) = bound();
        let err = evaluator.eval("error('boom', 0)").unwrap_err();
        match err {
            ScriptError::Evaluation { expression, message } => {
                assert_eq!(expression, "error('boom', 0)");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn instruction_limit_stops_runaway_scripts() {
        let config = EvaluatorConfig::default().with_instruction_limit(Some(10_000));
        let evaluator = LuaEvaluator::with_config(config).unwrap();

        let err = evaluator.eval_script("while true do end").unwrap_err();
        assert!(err.to_string().contains("instruction limit exceeded"));

        // The hook is removed after each evaluation.
        assert_eq!(evaluator.eval("40 + 2").unwrap(), json!(42));
    }

    #[test]
    fn instruction_limit_survives_pcall() {
        let config = EvaluatorConfig::default().with_instruction_limit(Some(10_000));
        let evaluator = LuaEvaluator::with_config(config).unwrap();

        let script = "n = 0; for i = 1, 2000 do pcall(function() while true do end end); n = n + 1 end; return n";
        let err = evaluator.eval_script(script).unwrap_err();
        assert!(err.to_string().contains("instruction limit exceeded"));
        assert_eq!(evaluator.data("n").unwrap(), json!(0));

        let nested = "return xpcall(function() return pcall(function() while true do end end) end, tostring)";
        assert!(evaluator.eval_script(nested).is_err());

        // Ordinary errors are still catchable once the budget is reset.
        assert_eq!(
            evaluator.eval("pcall(error, 'boom')").unwrap(),
            json!(false)
        );
    }

    #[test]
    fn zero_instruction_limit_is_rejected() {
        let config = EvaluatorConfig::default().with_instruction_limit(Some(0));
        assert!(matches!(config.validate(), Err(ScriptError::InvalidConfig(_))));
        assert!(matches!(
            LuaEvaluator::with_config(config),
            Err(ScriptError::InvalidConfig(_))
        ));

        let unlimited = EvaluatorConfig::default().with_instruction_limit(None);
        assert!(LuaEvaluator::with_config(unlimited).is_ok());
    }

    #[test]
    fn library_changes_do_not_outlive_an_evaluation() {
        let (evaluator, _context) = bound();
        evaluator
            .eval_script("string.format = nil; math.floor = nil; table.insert = nil")
            .unwrap();

        assert_eq!(evaluator.eval("string.format('%d', 3)").unwrap(), json!("3"));
        assert_eq!(evaluator.eval("math.floor(2.5)").unwrap(), json!(2));
        assert_eq!(
            evaluator.eval("getmetatable('')").unwrap(),
            json!("string")
        );
    }

    #[test]
    fn second_bind_is_rejected() {
        let (mut evaluator, context) = bound();
        let err = evaluator.bind_system_context(context).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Binding(BindingError::DuplicateBinding { .. })
        ));
    }
}
