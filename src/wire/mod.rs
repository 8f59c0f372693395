//! The DNS wire codec: query encoding and response parsing with
//! compression-pointer-safe name decoding.
pub mod message;
pub mod name;
