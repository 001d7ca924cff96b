#![cfg_attr(not(feature = "std"), no_std)]

//! Group arithmetic shared by the offline e-cash crates: the bilinear group description that every
//! participant agrees on, canonical (de)serialization of arkworks objects and hashing to the
//! scalar field or to curve points.

extern crate alloc;

#[macro_use]
pub mod macros;
pub mod bilinear_group;
pub mod hashing_utils;
pub mod serde_utils;

pub use bilinear_group::BilinearGroup;
