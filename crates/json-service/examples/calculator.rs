//! Calculator service example
//!
//! Registers a small calculator service and feeds it a few payloads: a
//! single call, a batch with one failing element, a named-parameter call,
//! malformed JSON, and a describe request.
//!
//! Run with `RUST_LOG=json_service=debug cargo run --example calculator`
//! to see the dispatcher's logging.

use json_service::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Calculator {
    memory: Mutex<f64>,
}

#[derive(Debug, thiserror::Error)]
#[error("cannot divide {0} by zero")]
struct DivideByZero(f64);

fn build_calculator() -> Result<MethodInvoker<Calculator>, RegistrationError> {
    MethodInvoker::builder("calculator", Calculator::default)
        .operation(
            OperationSpec::new("add")
                .param("a", ParamType::Integer)
                .param("b", ParamType::Integer)
                .returns(ParamType::Integer)
                .description("Integer addition"),
            |_: &Calculator, (a, b): (i64, i64)| Ok::<_, DivideByZero>(a + b),
        )
        .operation(
            OperationSpec::new("add")
                .param("a", ParamType::Number)
                .param("b", ParamType::Number)
                .returns(ParamType::Number),
            |_: &Calculator, (a, b): (f64, f64)| Ok::<_, DivideByZero>(a + b),
        )
        .operation(
            OperationSpec::new("divide")
                .param("dividend", ParamType::Number)
                .param("divisor", ParamType::Number)
                .returns(ParamType::Number),
            |_: &Calculator, (a, b): (f64, f64)| {
                if b == 0.0 { Err(DivideByZero(a)) } else { Ok(a / b) }
            },
        )
        .operation(
            OperationSpec::new("setMemory").param("value", ParamType::Number),
            |calc: &Calculator, (value,): (f64,)| {
                *calc.memory.lock() = value;
                Ok::<_, DivideByZero>(())
            },
        )
        .operation(
            OperationSpec::new("getMemory").returns(ParamType::Number),
            |calc: &Calculator, (): ()| Ok::<_, DivideByZero>(*calc.memory.lock()),
        )
        .build()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(ServiceRegistry::new());
    registry.register(build_calculator()?);

    let dispatcher = RequestDispatcher::with_config(
        Arc::clone(&registry),
        DispatcherConfig::default().with_diagnostics(false),
    );
    let context = CallContext::new("calculator").with_verb("POST");

    let payloads = [
        r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#,
        r#"{"jsonrpc":"2.0","method":"add","params":[0.5,0.25],"id":2}"#,
        r#"{"jsonrpc":"2.0","method":"divide","params":{"dividend":9,"divisor":0},"id":3}"#,
        r#"[{"method":"setMemory","params":[42]},{"method":"getMemory"},{"method":"sqrt","params":[4]}]"#,
        r#"{"method":"add","params":[1,2,3],"id":"too-many"}"#,
        r#"{"method": "add", "params": [1, 2"#,
    ];

    for payload in payloads {
        let response = dispatcher.handle_bytes(&context, payload.as_bytes());
        println!("--> {}", payload);
        println!("<-- {}\n", String::from_utf8_lossy(&response));
    }

    let describe = dispatcher.handle_request(
        RequestKind::from_http_method("GET"),
        &context,
        &[],
    );
    let smd: serde_json::Value = serde_json::from_slice(&describe)?;
    println!("Service map:\n{}", serde_json::to_string_pretty(&smd)?);

    Ok(())
}
