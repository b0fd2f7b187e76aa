//! Control core for a three-servo ball balancing platform.
//!
//! The crate is `no_std` (with `alloc`) unless the default `std` feature is
//! enabled; the tracking-subprocess reader is only available with `std`.
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod utils;
