//! A Lua datamodel reading the SCXML system variables of a live session.
//!
//! Run with `cargo run --example lua_session`.

use scxml_sysvars::context::SystemContextBuilder;
use scxml_sysvars::core::{EventRecord, EventType, IoProcessor};
use scxml_sysvars::lua::LuaEvaluator;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let context = Rc::new(RefCell::new(
        SystemContextBuilder::new()
            .name("vending-machine")
            .io_processor("http", IoProcessor::new("http://localhost:8080/vend"))
            .platform_variable("currency", json!("EUR"))
            .active_state("idle")
            .build()?,
    ));

    let mut evaluator = LuaEvaluator::new()?;
    evaluator.bind_system_context(context.clone())?;
    evaluator.inject_data("credit", &json!(0))?;

    println!("session:    {}", evaluator.eval("_sessionid")?);
    println!("machine:    {}", evaluator.eval("_name")?);
    println!("processors: {}", evaluator.eval("_ioprocessors")?);
    println!("platform:   {}", evaluator.eval("_x")?);
    println!("no event:   {}", evaluator.eval_cond("_event == nil")?);

    {
        let mut ctx = context.borrow_mut();
        ctx.dispatch(
            EventRecord::new("coin.inserted", EventType::External)
                .with_origin("http://localhost:8080/vend", "http")
                .with_data(json!({ "amount": 2 })),
        );
        ctx.exit_state("idle");
        ctx.enter_state("collecting");
    }

    evaluator.eval_script("credit = credit + _event.data.amount")?;
    println!("event:      {}", evaluator.eval("_event")?);
    println!("credit:     {}", evaluator.data("credit")?);
    println!("collecting: {}", evaluator.eval_cond("In('collecting')")?);
    println!("same event: {}", evaluator.eval_cond("rawequal(_event, _event)")?);

    match evaluator.eval_script("_sessionid = 'spoofed'") {
        Ok(_) => println!("write to _sessionid unexpectedly succeeded"),
        Err(err) => println!("rejected:   {err}"),
    }
    match evaluator.eval_script("_event.name = 'free.drink'") {
        Ok(_) => println!("write to _event.name unexpectedly succeeded"),
        Err(err) => println!("rejected:   {err}"),
    }
    match evaluator.eval_cond("In(42)") {
        Ok(_) => println!("In(42) unexpectedly succeeded"),
        Err(err) => println!("rejected:   {err}"),
    }

    let child = context.borrow_mut().generate_session_id();
    println!("child id:   {child}");

    Ok(())
}
