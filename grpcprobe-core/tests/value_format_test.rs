use grpcprobe_core::codec::CodecRegistry;
use grpcprobe_core::codec::uuid::NullUuidCodec;
use grpcprobe_core::format::ValueFormatter;
use grpcprobe_core::path::FieldPathEngine;
use prost_reflect::DynamicMessage;

mod fixtures;

fn build(registry: &CodecRegistry, params: &[(&str, &str)]) -> DynamicMessage {
    let engine = FieldPathEngine::new(registry.clone());
    let mut request = fixtures::order_request();
    for (path, value) in params {
        engine.assign(&mut request, path, value).unwrap();
    }
    request
}

fn render(params: &[(&str, &str)]) -> String {
    let registry = CodecRegistry::with_defaults();
    let request = build(&registry, params);
    ValueFormatter::new(registry).format(&request).unwrap()
}

#[test]
fn test_empty_message_renders_nothing() {
    assert_eq!(render(&[]), "");
}

#[test]
fn test_populated_request() {
    let text = render(&[
        ("customer", "alice"),
        ("address.city", "Paris"),
        ("tags.0", "a"),
        ("tags.1", "b"),
        ("scores.bob", "2"),
        ("scores.alice", "1"),
        ("items.0.sku", "A1"),
        ("items.0.quantity", "2"),
        ("limit", "10"),
    ]);

    assert_eq!(
        text,
        "customer: alice\n\
         address:\n\
         \tcity: Paris\n\
         tags[]:\n\
         \t- a\n\
         \t- b\n\
         scores[map]:\n\
         \t- alice: 1\n\
         \t- bob: 2\n\
         items[]:\n\
         \t-\n\
         \t\tsku: A1\n\
         \t\tquantity: 2\n\
         limit: 10\n"
    );
}

#[test]
fn test_unset_fields_are_skipped() {
    let text = render(&[("customer", "bob")]);

    assert_eq!(text, "customer: bob\n");
    assert!(!text.contains("address"));
}

#[test]
fn test_set_but_empty_submessage_has_no_children() {
    // Assigning an empty city creates `address` but leaves the city at its default.
    let text = render(&[("address.city", "")]);

    assert_eq!(text, "address:\n");
}

#[test]
fn test_map_of_messages() {
    let text = render(&[
        ("locations.work.city", "Milan"),
        ("locations.home.city", "Rome"),
    ]);

    assert_eq!(
        text,
        "locations[map]:\n\
         \t- home\n\
         \t\tcity: Rome\n\
         \t- work\n\
         \t\tcity: Milan\n"
    );
}

#[test]
fn test_integer_map_keys_sort_numerically() {
    let text = render(&[("labels.10", "ten"), ("labels.9", "nine")]);

    assert_eq!(text, "labels[map]:\n\t- 9: nine\n\t- 10: ten\n");
}

#[test]
fn test_getter_output_is_not_expanded() {
    let text = render(&[
        ("placed_at", "2024-01-02T03:04:05Z"),
        ("limits.0", "5"),
        ("limits.1", "6"),
    ]);

    assert_eq!(
        text,
        "placed_at: 2024-01-02T03:04:05Z\nlimits[]:\n\t- 5\n\t- 6\n"
    );
}

#[test]
fn test_without_getter_messages_are_expanded() {
    let registry = CodecRegistry::new();
    let request = build(&CodecRegistry::with_defaults(), &[("limit", "10")]);

    let text = ValueFormatter::new(registry).format(&request).unwrap();
    assert_eq!(text, "limit:\n\tvalue: 10\n");
}

#[test]
fn test_scalar_kinds_and_enums() {
    let text = render(&[
        ("status", "STATUS_SHIPPED"),
        ("email", "a@b.c"),
        ("gift", "true"),
        ("ratio", "0.5"),
        ("payload", "raw"),
    ]);

    assert_eq!(
        text,
        "status: 2\nemail: a@b.c\ngift: true\nratio: 0.5\npayload: raw\n"
    );
}

#[test]
fn test_custom_getter() {
    let registry = CodecRegistry::with_defaults().with_codec(NullUuidCodec::default());
    let request = build(&registry, &[("parent_id", "")]);

    let text = ValueFormatter::new(registry).format(&request).unwrap();
    assert_eq!(text, "parent_id: <null>\n");
}
