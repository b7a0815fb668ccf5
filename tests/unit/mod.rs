//! Tests of the crate's pure building blocks through its public API

pub mod tracks;
