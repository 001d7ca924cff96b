/// Concatenates supplied slices into one continuous vector.
#[macro_export]
macro_rules! concat_slices {
    ($($slice: expr),+) => {
        [$(&$slice[..]),+].concat()
    }
}

/// Checks that the product of pairings of the supplied pairs is the identity of the target group.
/// ```compile_fail
/// pairing_product_is_one! {
///     using E:
///     a, c;
///     b, d
/// }
/// ```
/// Will be transformed to:
/// ```compile_fail
/// E::multi_pairing([a, b], [c, d]).is_zero()
/// ```
#[macro_export]
macro_rules! pairing_product_is_one {
    (using $pairing_engine: path: $($g1: expr, $g2: expr);+) => {
        ark_std::Zero::is_zero(&<$pairing_engine as ark_ec::pairing::Pairing>::multi_pairing(
            [
                $(<$pairing_engine as ark_ec::pairing::Pairing>::G1Prepared::from($g1)),+
            ],
            [
                $(<$pairing_engine as ark_ec::pairing::Pairing>::G2Prepared::from($g2)),+
            ]
        ))
    }
}
