use crate::concat_slices;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use digest::Digest;

/// Hash bytes to a field element. This is vulnerable to timing attack and is only used when input
/// is public anyway like when computing a signature challenge
pub fn field_elem_from_try_and_incr<F: PrimeField, D: Digest>(bytes: &[u8]) -> F {
    let mut hash = D::digest(bytes);
    let mut attempt = 1u64;
    loop {
        if let Some(f) = F::from_random_bytes(&hash) {
            return f;
        }
        hash = D::digest(concat_slices![bytes, b"-attempt-", attempt.to_be_bytes()]);
        attempt += 1;
    }
}

/// Hash bytes to a point on the curve. Returns as Affine coordinates. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters.
pub fn affine_group_elem_from_try_and_incr<G: AffineRepr, D: Digest>(bytes: &[u8]) -> G {
    let mut hash = D::digest(bytes);
    let mut attempt = 1u64;
    loop {
        if let Some(p) = G::from_random_bytes(&hash) {
            let p = p.mul_by_cofactor_to_group().into_affine();
            if !p.is_zero() {
                return p;
            }
        }
        hash = D::digest(concat_slices![bytes, b"-attempt-", attempt.to_be_bytes()]);
        attempt += 1;
    }
}
