//! Domain types for datasaver
//!
//! Keys, codecs and save policies, without any I/O concerns.

mod codec;
mod key;
mod policy;

pub use codec::{Codec, CodecError, FnCodec, JsonCodec, Optional};
pub use key::{Key, KeyError, MAX_KEY_LEN};
pub use policy::{ParsePolicyError, SavePolicy};
