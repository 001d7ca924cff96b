use crate::{proof::GrothSahaiProof, setup::CrsTrapdoor};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};

/// Decrypts the commitment `(c1, c2) = (g * r, X + u * r)` to the sender's public key `X` with the
/// trapdoor `alpha`. Only the TTP can do this.
pub fn extract_identity<E: Pairing>(
    proof: &GrothSahaiProof<E>,
    trapdoor: &CrsTrapdoor<E::ScalarField>,
) -> E::G1Affine {
    (proof.c2.into_group() - proof.c1 * trapdoor.alpha).into_affine()
}
