//! # Dynamic Protobuf Codec
//!
//! Implements `tonic::codec::Codec` for `prost_reflect::DynamicMessage`, so tonic can move
//! messages whose types are only known at runtime.
//!
//! Encoding needs no schema: a `DynamicMessage` carries its own descriptor. Decoding reads
//! the raw bytes into an empty message of the descriptor given at construction, which is
//! the method's output type on the client side and its input type on the server side.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

#[derive(Debug, Clone)]
pub struct DynamicCodec {
    /// Schema of the messages read from the wire.
    decode_desc: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(decode_desc: MessageDescriptor) -> Self {
        Self { decode_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.decode_desc.clone())
    }
}

/// Writes a message's fields in wire format.
#[derive(Debug)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode_raw(dst);
        Ok(())
    }
}

/// Reads wire bytes into a message of a fixed type.
#[derive(Debug)]
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src).map_err(|e| {
            Status::internal(format!(
                "Failed to decode Protobuf bytes as '{}': {}",
                self.0.full_name(),
                e
            ))
        })?;

        Ok(Some(msg))
    }
}
