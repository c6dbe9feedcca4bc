//! Schemas shared by the integration tests, built from descriptor protos so no `protoc`
//! is needed. Mirrors this proto source:
//!
//! ```proto
//! // shop/v1/shop.proto
//! syntax = "proto3";
//! package shop.v1;
//!
//! enum Status { STATUS_UNKNOWN = 0; STATUS_PENDING = 1; STATUS_SHIPPED = 2; }
//! message Address { string city = 1; string street = 2; }
//! message Item { string sku = 1; int32 quantity = 2; }
//! message OrderRequest {
//!   string customer = 1;
//!   int32 count = 2;
//!   Address address = 3;
//!   repeated string tags = 4;
//!   map<string, int32> scores = 5;
//!   repeated Item items = 6;
//!   map<string, Address> locations = 7;
//!   Status status = 8;
//!   google.protobuf.Int32Value limit = 9;
//!   oneof contact { string email = 10; string phone = 11; Address addr = 24; }
//!   bool gift = 12;
//!   double total = 13;
//!   uint64 ref_id = 14;
//!   sint64 delta = 15;
//!   fixed32 code = 16;
//!   float ratio = 17;
//!   bytes payload = 18;
//!   google.protobuf.Timestamp placed_at = 19;
//!   fproto_wrap.UUID order_id = 20;
//!   fproto_wrap.NullUUID parent_id = 21;
//!   map<int32, string> labels = 22;
//!   repeated google.protobuf.Int32Value limits = 23;
//! }
//! message OrderReply { string id = 1; OrderRequest echo = 2; }
//! message Node { string name = 1; repeated Node children = 2; }
//! service OrderService {
//!   rpc PlaceOrder(OrderRequest) returns (OrderReply);
//!   rpc CancelOrder(OrderRequest) returns (OrderReply);
//!   rpc SlowOrder(OrderRequest) returns (OrderReply);
//!   rpc WatchOrders(OrderRequest) returns (stream OrderReply);
//! }
//!
//! // legacy/v1/legacy.proto
//! syntax = "proto2";
//! package legacy.v1;
//! message LegacyRequest { required string token = 1; optional int32 retries = 2; }
//! message LegacyReply { optional bool accepted = 1; }
//! service LegacyService { rpc Submit(LegacyRequest) returns (LegacyReply); }
//! ```
#![allow(dead_code)]

pub mod shop_service;

use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const ORDER_SERVICE: &str = "shop.v1.OrderService";
pub const LEGACY_SERVICE: &str = "legacy.v1.LegacyService";

pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![wrappers_file(), timestamp_file(), uuid_file(), shop_file(), legacy_file()],
    }
}

pub fn encoded_file_descriptor_set() -> Vec<u8> {
    file_descriptor_set().encode_to_vec()
}

pub fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set()).unwrap()
}

pub fn message_descriptor(full_name: &str) -> MessageDescriptor {
    pool()
        .get_message_by_name(full_name)
        .unwrap_or_else(|| panic!("fixture message {full_name} missing"))
}

pub fn order_request() -> DynamicMessage {
    DynamicMessage::new(message_descriptor("shop.v1.OrderRequest"))
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, ty)
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    typed(name, number, Type::Message, type_name)
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

fn required(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Required as i32),
        ..field
    }
}

fn in_oneof(field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(index),
        ..field
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn map_entry(
    name: &str,
    key: FieldDescriptorProto,
    value: FieldDescriptorProto,
) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(name, vec![key, value])
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

fn wrappers_file() -> FileDescriptorProto {
    let wrapper = |name: &str, ty: Type| message(name, vec![field("value", 1, ty)]);

    FileDescriptorProto {
        name: Some("google/protobuf/wrappers.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            wrapper("DoubleValue", Type::Double),
            wrapper("Int32Value", Type::Int32),
            wrapper("UInt64Value", Type::Uint64),
            wrapper("BoolValue", Type::Bool),
            wrapper("StringValue", Type::String),
        ],
        ..Default::default()
    }
}

fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![message(
            "Timestamp",
            vec![field("seconds", 1, Type::Int64), field("nanos", 2, Type::Int32)],
        )],
        ..Default::default()
    }
}

fn uuid_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("fproto_wrap/uuid.proto".to_string()),
        package: Some("fproto_wrap".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message("UUID", vec![field("value", 1, Type::String)]),
            message(
                "NullUUID",
                vec![field("value", 1, Type::String), field("valid", 2, Type::Bool)],
            ),
        ],
        ..Default::default()
    }
}

fn shop_file() -> FileDescriptorProto {
    let order_request = DescriptorProto {
        nested_type: vec![
            map_entry(
                "ScoresEntry",
                field("key", 1, Type::String),
                field("value", 2, Type::Int32),
            ),
            map_entry(
                "LocationsEntry",
                field("key", 1, Type::String),
                message_field("value", 2, ".shop.v1.Address"),
            ),
            map_entry(
                "LabelsEntry",
                field("key", 1, Type::Int32),
                field("value", 2, Type::String),
            ),
        ],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("contact".to_string()),
            ..Default::default()
        }],
        ..message(
            "OrderRequest",
            vec![
                field("customer", 1, Type::String),
                field("count", 2, Type::Int32),
                message_field("address", 3, ".shop.v1.Address"),
                repeated(field("tags", 4, Type::String)),
                repeated(message_field("scores", 5, ".shop.v1.OrderRequest.ScoresEntry")),
                repeated(message_field("items", 6, ".shop.v1.Item")),
                repeated(message_field("locations", 7, ".shop.v1.OrderRequest.LocationsEntry")),
                typed("status", 8, Type::Enum, ".shop.v1.Status"),
                message_field("limit", 9, ".google.protobuf.Int32Value"),
                in_oneof(field("email", 10, Type::String), 0),
                in_oneof(field("phone", 11, Type::String), 0),
                field("gift", 12, Type::Bool),
                field("total", 13, Type::Double),
                field("ref_id", 14, Type::Uint64),
                field("delta", 15, Type::Sint64),
                field("code", 16, Type::Fixed32),
                field("ratio", 17, Type::Float),
                field("payload", 18, Type::Bytes),
                message_field("placed_at", 19, ".google.protobuf.Timestamp"),
                message_field("order_id", 20, ".fproto_wrap.UUID"),
                message_field("parent_id", 21, ".fproto_wrap.NullUUID"),
                repeated(message_field("labels", 22, ".shop.v1.OrderRequest.LabelsEntry")),
                repeated(message_field("limits", 23, ".google.protobuf.Int32Value")),
                in_oneof(message_field("addr", 24, ".shop.v1.Address"), 0),
            ],
        )
    };

    let status = EnumDescriptorProto {
        name: Some("Status".to_string()),
        value: ["STATUS_UNKNOWN", "STATUS_PENDING", "STATUS_SHIPPED"]
            .iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("shop/v1/shop.proto".to_string()),
        package: Some("shop.v1".to_string()),
        syntax: Some("proto3".to_string()),
        dependency: vec![
            "google/protobuf/wrappers.proto".to_string(),
            "google/protobuf/timestamp.proto".to_string(),
            "fproto_wrap/uuid.proto".to_string(),
        ],
        enum_type: vec![status],
        message_type: vec![
            message(
                "Address",
                vec![field("city", 1, Type::String), field("street", 2, Type::String)],
            ),
            message(
                "Item",
                vec![field("sku", 1, Type::String), field("quantity", 2, Type::Int32)],
            ),
            order_request,
            message(
                "OrderReply",
                vec![
                    field("id", 1, Type::String),
                    message_field("echo", 2, ".shop.v1.OrderRequest"),
                ],
            ),
            message(
                "Node",
                vec![
                    field("name", 1, Type::String),
                    repeated(message_field("children", 2, ".shop.v1.Node")),
                ],
            ),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("OrderService".to_string()),
            method: vec![
                method("PlaceOrder", ".shop.v1.OrderRequest", ".shop.v1.OrderReply"),
                method("CancelOrder", ".shop.v1.OrderRequest", ".shop.v1.OrderReply"),
                method("SlowOrder", ".shop.v1.OrderRequest", ".shop.v1.OrderReply"),
                MethodDescriptorProto {
                    server_streaming: Some(true),
                    ..method("WatchOrders", ".shop.v1.OrderRequest", ".shop.v1.OrderReply")
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn legacy_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("legacy/v1/legacy.proto".to_string()),
        package: Some("legacy.v1".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![
            message(
                "LegacyRequest",
                vec![
                    required(field("token", 1, Type::String)),
                    field("retries", 2, Type::Int32),
                ],
            ),
            message("LegacyReply", vec![field("accepted", 1, Type::Bool)]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("LegacyService".to_string()),
            method: vec![method(
                "Submit",
                ".legacy.v1.LegacyRequest",
                ".legacy.v1.LegacyReply",
            )],
            ..Default::default()
        }],
        ..Default::default()
    }
}
