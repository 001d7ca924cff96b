#![cfg_attr(not(feature = "std"), no_std)]

//! Groth-Sahai style non-interactive proof that a coin state `theta` was correctly re-randomized by the
//! holder of the previous state, in the SXDH setting.
//!
//! Setup. The TTP creates a [`Crs`] `{g, u = g * alpha, h, v = h * beta}` and keeps [`CrsTrapdoor`]
//! `{alpha, beta}`.
//!
//! Coin state. A coin is owned by whoever knows `t` with `theta = g * -t`.
//!
//! Transfer. The receiver picks a fresh `t'` and publishes [`RandomizationElements`] for it. The sender
//! with key pair `(x, X = g * x)` and current secret `t` proves, without revealing `t'`,
//! `e(X, Y) = e(-theta, h)` for `Y = h * (t / x)`. `X` is committed to in `C = (g * r, X + u * r)`,
//! `Y` in `D = (h * s, Y + v * s)`. The new coin state is the `theta1` of the proof, `g * -t'`.
//!
//! Tracing. `C` is an ElGamal encryption of `X` under `alpha` so the TTP recovers the sender's public
//! key from any proof. Two proofs spending the same coin state name the same key.

extern crate alloc;

pub mod error;
pub mod extraction;
pub mod proof;
pub mod randomization;
pub mod setup;

pub use error::GrothSahaiError;
pub use extraction::extract_identity;
pub use proof::{GrothSahaiProof, TransactionProof};
pub use randomization::RandomizationElements;
pub use setup::{Crs, CrsTrapdoor};
