//! Frame validation and (de)serialization.

pub mod serializer;
pub mod validator;

pub use serializer::{decode_client_event, encode_server_event};
pub use validator::validate_inbound;
