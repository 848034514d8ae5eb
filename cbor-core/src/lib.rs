//! Tagged CBOR value model and codec.
//!
//! [`CborValue`] is the typed item model; [`Encoder`]/[`Decoder`] stream
//! the RFC 8949 wire format through [`Sink`]/[`Source`] abstractions. The
//! encoder always produces the canonical encoding; the decoder accepts
//! lenient input by default and enforces canonical form on request. A
//! [`TagRegistry`] attaches semantics to tagged items, normalising the
//! numeric tags (2, 3, 4, 5, 30) into the arbitrary-precision types of
//! [`cbor_bigint`] and [`cbor_real`].

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod decode;
mod encode;
mod error;
mod half;
mod io;
mod tags;
mod value;
mod wire;

pub use decode::{
    from_slice,
    from_slice_canonical,
    DecodeOptions,
    Decoder,
};
pub use encode::{
    tag,
    to_vec,
    Encoder,
};
pub use error::{
    DecodeError,
    EncodeError,
};
pub use io::{
    Sink,
    SliceSink,
    Source,
};
pub use tags::{
    CborTypeFilter,
    TagError,
    TagHandler,
    TagRegistry,
};
pub use value::{
    CborFloat,
    CborMap,
    CborValue,
};
pub use wire::MajorType;
