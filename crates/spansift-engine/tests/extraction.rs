use serde_json::{Value, json};
use spansift_compiler::{compile, parse_spec};
use spansift_engine::extract;
use spansift_types::{AttributeMap, CompiledBundle};

fn bundle() -> CompiledBundle {
    let spec = parse_spec(
        r#"
        id = "acme"

        [patterns.otel]
        signature = ["gen_ai.system", "gen_ai.request.model"]
        confidence = 0.9
        instrumentor = "otel_genai"

        [patterns.oi]
        signature = ["llm.provider", "llm.model_name"]
        confidence = 0.85
        instrumentor = "openinference"

        [rules."otel_genai.model_name"]
        method = "direct"
        source = "gen_ai.request.model"
        fallback = "unknown"
        validator = { kind = "non_empty" }

        [rules."openinference.model_name"]
        method = "direct"
        source = "llm.model_name"
        fallback = "unknown"

        [rules.temperature]
        method = "direct"
        source = "gen_ai.request.temperature"
        validator = { kind = "numeric" }

        [rules.messages]
        method = "array"
        source = "gen_ai.prompt"

        [rules.completion]
        method = "json_pointer"
        source = "gen_ai.completion"
        pointer = "/0/content"

        [rules.request_id]
        method = "first_of"
        sources = ["gen_ai.response.id", "acme.request_id"]

        [rules.total_tokens]
        method = "sum"
        sources = ["gen_ai.usage.input_tokens", "gen_ai.usage.output_tokens"]

        [mappings.inputs.messages]
        source = "messages"

        [mappings.outputs.completion]
        source = "completion"

        [mappings.outputs.total_tokens]
        source = "total_tokens"

        [mappings.config.model]
        source = "model_name"
        required = true

        [mappings.config.temperature]
        source = "temperature"

        [mappings.metadata.request_id]
        source = "request_id"

        [mappings.metadata.vendor]
        transform = "vendor"
        required = true

        [transforms.vendor]
        kind = "static_constant"
        value = "acme"
    "#,
    )
    .expect("spec parses");
    compile(&[spec]).expect("spec compiles").bundle
}

fn attrs(pairs: &[(&str, Value)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn full_extraction_populates_all_sections() {
    let bundle = bundle();
    let map = attrs(&[
        ("gen_ai.system", json!("acme")),
        ("gen_ai.request.model", json!("acme-large")),
        ("gen_ai.request.temperature", json!(0.2)),
        ("gen_ai.prompt.0.role", json!("user")),
        ("gen_ai.prompt.0.content", json!("hello")),
        ("gen_ai.completion", json!(r#"[{"content": "hi there"}]"#)),
        ("gen_ai.response.id", json!("resp-1")),
        ("gen_ai.usage.input_tokens", json!(12)),
        ("gen_ai.usage.output_tokens", json!(3)),
    ]);

    let result = extract(&bundle, "acme", "otel_genai", &map);

    assert_eq!(
        result.inputs["messages"],
        json!([{"role": "user", "content": "hello"}])
    );
    assert_eq!(result.outputs["completion"], json!("hi there"));
    assert_eq!(result.outputs["total_tokens"], json!(15));
    assert_eq!(result.config["model"], json!("acme-large"));
    assert_eq!(result.config["temperature"], json!(0.2));
    assert_eq!(result.metadata["request_id"], json!("resp-1"));
    assert_eq!(result.metadata["vendor"], json!("acme"));
    assert_eq!(result.metadata["provider"], json!("acme"));
}

#[test]
fn missing_model_attribute_yields_declared_fallback() {
    let bundle = bundle();
    let map = attrs(&[("gen_ai.system", json!("acme"))]);

    let result = extract(&bundle, "acme", "otel_genai", &map);
    assert_eq!(result.config["model"], json!("unknown"));
}

#[test]
fn failed_validator_substitutes_fallback_silently() {
    let bundle = bundle();
    // Empty model fails non_empty -> rule fallback. Non-numeric
    // temperature fails numeric and has no fallback -> absent.
    let map = attrs(&[
        ("gen_ai.request.model", json!("")),
        ("gen_ai.request.temperature", json!("hot")),
    ]);

    let result = extract(&bundle, "acme", "otel_genai", &map);
    assert_eq!(result.config["model"], json!("unknown"));
    assert!(!result.config.contains_key("temperature"));
}

#[test]
fn routing_follows_the_instrumentor() {
    let bundle = bundle();
    let map = attrs(&[
        ("llm.provider", json!("acme")),
        ("llm.model_name", json!("acme-mini")),
        // Present but not the openinference model source.
        ("gen_ai.request.model", json!("acme-large")),
    ]);

    let result = extract(&bundle, "acme", "openinference", &map);
    assert_eq!(result.config["model"], json!("acme-mini"));
}

#[test]
fn unknown_provider_gets_the_required_floor_only() {
    let bundle = bundle();
    let map = attrs(&[("whatever", json!(1))]);

    let result = extract(&bundle, "unknown", "", &map);
    assert_eq!(result.metadata["provider"], json!("unknown"));
    assert_eq!(result.config["model"], json!("unknown"));
    assert_eq!(result.field_count(), 2);
}

#[test]
fn unknown_instrumentor_still_floors_required_fields() {
    let bundle = bundle();
    let map = attrs(&[("gen_ai.request.model", json!("acme-large"))]);

    let result = extract(&bundle, "acme", "no_such_instrumentor", &map);
    // No routing table -> rule-backed fields unresolved, but the
    // constant transform and the floor still apply.
    assert_eq!(result.config["model"], json!("unknown"));
    assert_eq!(result.metadata["vendor"], json!("acme"));
    assert_eq!(result.metadata["provider"], json!("acme"));
}

#[test]
fn extraction_is_pure_and_idempotent() {
    let bundle = bundle();
    let map = attrs(&[
        ("gen_ai.request.model", json!("acme-large")),
        ("gen_ai.usage.input_tokens", json!(5)),
    ]);

    let first = extract(&bundle, "acme", "otel_genai", &map);
    for _ in 0..10 {
        assert_eq!(extract(&bundle, "acme", "otel_genai", &map), first);
    }
}
