//! End-to-end dispatch through the public API

use json_service::prelude::*;
use json_service::{DataUri, ServiceMap};
use serde::Serialize;
use serde_json::{Value, json};
use serial_test::serial;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Calculator;

#[derive(Serialize)]
struct Account {
    #[serde(rename = "getOwner")]
    owner: String,
    #[serde(rename = "isActive")]
    active: bool,
    #[serde(rename = "setLimit")]
    limit: i64,
}

fn calculator() -> MethodInvoker<Calculator> {
    MethodInvoker::with_instance("calc", Calculator)
        .operation(
            OperationSpec::new("add")
                .param("a", ParamType::Integer)
                .param("b", ParamType::Integer)
                .returns(ParamType::Integer),
            |_: &Calculator, (a, b): (i64, i64)| Ok::<_, Infallible>(a + b),
        )
        .operation(
            OperationSpec::new("add")
                .param("a", ParamType::Number)
                .param("b", ParamType::Number)
                .returns(ParamType::Number),
            |_: &Calculator, (a, b): (f64, f64)| Ok::<_, Infallible>(a + b),
        )
        .operation(
            OperationSpec::new("ping").returns(ParamType::String),
            |_: &Calculator, (): ()| Ok::<_, Infallible>("pong"),
        )
        .operation(
            OperationSpec::new("divide")
                .param("a", ParamType::Integer)
                .param("b", ParamType::Integer),
            |_: &Calculator, (a, b): (i64, i64)| {
                a.checked_div(b).ok_or_else(|| anyhow::anyhow!("division by zero"))
            },
        )
        .operation(
            OperationSpec::new("account").returns(ParamType::Object),
            |_: &Calculator, (): ()| {
                Ok::<_, Infallible>(Account {
                    owner: "ada".to_string(),
                    active: true,
                    limit: 10,
                })
            },
        )
        .operation(
            OperationSpec::new("mediaType").param("uri", ParamType::String),
            |_: &Calculator, (uri,): (DataUri,)| Ok::<_, Infallible>(uri.media_type),
        )
        .operation(
            OperationSpec::new("shout").param("uri", ParamType::String),
            |_: &Calculator, (uri,): (DataUri,)| {
                let upper = DataUri::new(uri.data.to_ascii_uppercase());
                Ok::<_, Infallible>(upper.with_media_type("text/plain"))
            },
        )
        .build()
        .unwrap()
}

fn dispatcher_with(config: DispatcherConfig) -> RequestDispatcher {
    let registry = Arc::new(ServiceRegistry::new());
    registry.register(calculator());
    RequestDispatcher::with_config(registry, config)
}

fn dispatch(dispatcher: &RequestDispatcher, payload: &str) -> Value {
    let bytes = dispatcher.handle_bytes(&CallContext::new("calc"), payload.as_bytes());
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_add_returns_bare_result() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let bytes = dispatcher.handle_bytes(
        &CallContext::new("calc"),
        br#"{"method":"add","params":[2,3]}"#,
    );
    assert_eq!(bytes, b"5");
}

#[test]
fn test_overload_picks_number_variant_for_fractions() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    assert_eq!(dispatch(&dispatcher, r#"{"method":"add","params":[1.5,2]}"#), json!(3.5));
    assert_eq!(dispatch(&dispatcher, r#"{"method":"add","params":{"a":1,"b":2}}"#), json!(3));
}

#[test]
fn test_zero_argument_operation() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    assert_eq!(dispatch(&dispatcher, r#"{"method":"ping","id":7}"#), json!("pong"));
}

#[test]
fn test_missing_method_envelope_is_exact() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let bytes = dispatcher.handle_bytes(&CallContext::new("calc"), br#"{"method":"missing"}"#);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method 'missing' not found"},"id":null}"#
    );
}

#[test]
fn test_batch_preserves_order_and_mixed_outcomes() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let response = dispatch(
        &dispatcher,
        r#"[{"method":"add","params":[1,1]},{"method":"bogus"},{"method":"ping","id":"p"}]"#,
    );

    let items = response.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], json!(2));
    assert_eq!(items[1]["error"]["code"], json!(METHOD_NOT_FOUND));
    assert_eq!(items[1]["id"], Value::Null);
    assert_eq!(items[2], json!("pong"));
}

#[test]
fn test_wrong_arity_is_invalid_params() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let response = dispatch(&dispatcher, r#"{"method":"add","params":[1],"id":3}"#);
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    assert_eq!(response["id"], json!(3));
}

#[test]
fn test_invalid_json() {
    let lenient = dispatcher_with(DispatcherConfig::default());
    let response = dispatch(&lenient, "{not json");
    assert_eq!(response["error"]["code"], json!(INVALID_REQUEST));
    assert_eq!(response["id"], Value::Null);

    let strict = dispatcher_with(DispatcherConfig::default().with_strict_parse_errors(true));
    let response = dispatch(&strict, "{not json");
    assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
}

#[test]
fn test_operation_error_becomes_internal_error() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let response = dispatch(&dispatcher, r#"{"method":"divide","params":[1,0],"id":1}"#);
    assert_eq!(response["error"]["code"], json!(INTERNAL_ERROR));
    assert_eq!(response["error"]["message"], json!("division by zero"));
    assert!(response["error"]["data"].is_string());
}

#[test]
fn test_naming_round_trip() {
    let accessor = dispatcher_with(DispatcherConfig::default());
    assert_eq!(
        dispatch(&accessor, r#"{"method":"account"}"#),
        json!({"owner": "ada", "active": true, "setLimit": 10})
    );

    let equal = dispatcher_with(DispatcherConfig::default().with_naming(NamingPolicy::Equal));
    assert_eq!(
        dispatch(&equal, r#"{"method":"account"}"#),
        json!({"owner": "ada", "active": true, "limit": 10})
    );
}

#[test]
fn test_data_uri_arguments_and_results() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    assert_eq!(
        dispatch(&dispatcher, r#"{"method":"mediaType","params":["data:image/gif;base64,R0lG"]}"#),
        json!("image/gif")
    );
    assert_eq!(
        dispatch(&dispatcher, r#"{"method":"shout","params":["data:,hello"]}"#),
        json!("data:text/plain;base64,SEVMTE8")
    );

    let response = dispatch(&dispatcher, r#"{"method":"mediaType","params":["not a uri"],"id":2}"#);
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
}

#[test]
fn test_wrapped_results() {
    let dispatcher = dispatcher_with(DispatcherConfig::default().with_wrapped_results(true));
    assert_eq!(
        dispatch(&dispatcher, r#"{"method":"add","params":[2,2],"id":"x"}"#),
        json!({"jsonrpc": "2.0", "result": 4, "id": "x"})
    );
}

#[test]
fn test_describe_lists_every_overload() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let bytes = dispatcher.handle_request(
        RequestKind::from_http_method("GET"),
        &CallContext::new("calc"),
        &[],
    );
    let smd: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(smd["SMDVersion"], json!("2.0"));
    assert_eq!(smd["target"], json!("calc"));
    assert_eq!(smd["services"]["add"].as_array().unwrap().len(), 2);
    assert_eq!(smd["services"]["ping"][0]["returns"], json!("string"));

    let map: ServiceMap = dispatcher.service_map("calc").unwrap();
    assert_eq!(map.method_count(), 7);
}

#[test]
fn test_unknown_service_is_invalid_request() {
    let dispatcher = dispatcher_with(DispatcherConfig::default());
    let bytes = dispatcher.handle_bytes(
        &CallContext::new("nowhere"),
        br#"{"method":"add","params":[1,2],"id":5}"#,
    );
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response["error"]["code"], json!(INVALID_REQUEST));
    assert_eq!(response["id"], json!(5));
}

#[test]
fn test_instance_built_once_under_concurrent_dispatch() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counter;
    let invoker = MethodInvoker::builder("counter", || {
        BUILT.fetch_add(1, Ordering::SeqCst);
        Counter
    })
    .operation(
        OperationSpec::new("ping"),
        |_: &Counter, (): ()| Ok::<_, Infallible>(true),
    )
    .build()
    .unwrap();

    let registry = Arc::new(ServiceRegistry::new());
    registry.register(invoker);
    let dispatcher = Arc::new(RequestDispatcher::new(Arc::clone(&registry)));
    assert!(!registry.lookup("counter").unwrap().is_initialized());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                dispatcher.handle_bytes(&CallContext::new("counter"), br#"{"method":"ping"}"#)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), b"true");
    }
    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ambiguous_overloads_rejected() {
    let result = MethodInvoker::with_instance("dup", Calculator)
        .operation(
            OperationSpec::new("f").param("x", ParamType::Integer),
            |_: &Calculator, (x,): (i64,)| Ok::<_, Infallible>(x),
        )
        .operation(
            OperationSpec::new("f").param("y", ParamType::Integer),
            |_: &Calculator, (y,): (i64,)| Ok::<_, Infallible>(-y),
        )
        .build();
    assert!(matches!(result, Err(RegistrationError::AmbiguousOverload { .. })));
}

#[test]
#[serial]
fn test_dispatch_through_global_registry() {
    ServiceRegistry::global().register(calculator());

    let registry = Arc::new(ServiceRegistry::new());
    let local = RequestDispatcher::new(registry);
    let response: Value = serde_json::from_slice(
        &local.handle_bytes(&CallContext::new("calc"), br#"{"method":"ping"}"#),
    )
    .unwrap();
    assert_eq!(response["error"]["code"], json!(INVALID_REQUEST));

    let invoker = ServiceRegistry::global().lookup("calc").unwrap();
    assert_eq!(
        invoker.process(&CallContext::new("calc"), "add", vec![json!(20), json!(22)]).unwrap(),
        json!(42)
    );
    ServiceRegistry::global().unregister("calc");
}
