//! Label codec
//!
//! Maps a non-negative index to a fixed-length label over a charset and back.
//! The mapping is base-C positional encoding, most significant symbol first,
//! zero-padded to the requested length, so `[0, C^L)` is in bijection with the
//! labels of length `L`.

mod codec;

pub use codec::{decode_label, encode_label, space_size, Charset, CharsetError};
