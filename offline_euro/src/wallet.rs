use crate::{
    config::FeeConfig,
    digital_euro::{DigitalEuro, EuroDescriptor},
    error::OfflineEuroError,
    fee::{fee_basis_points, value_after_fee, whole_hours_between},
    keys::KeyPair,
    repository::{Record, Repository},
    transaction::{create_transaction, TransactionDetails},
    Signature,
};
use ark_ec::pairing::Pairing;
use ark_std::rand::RngCore;
use ecash_crypto_utils::{serde_utils::ArkObjectBytes, BilinearGroup};
use groth_sahai::{Crs, RandomizationElements};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::sync::Arc;
use tracing::debug;

/// A coin as held by its current owner
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct WalletEntry<E: Pairing> {
    pub digital_euro: DigitalEuro<E>,
    /// Secret of the coin state, `current_theta = g * -t`
    #[serde_as(as = "ArkObjectBytes")]
    pub t: E::ScalarField,
    /// The signature on the coin state received from the previous holder. Forwarded on the next spend.
    pub transaction_signature: Option<Signature<E>>,
    /// 0 unspent, 1 spent, more than 1 double spent. Never decreases.
    pub times_spent: u32,
    /// Milliseconds since the Unix epoch
    pub received_timestamp: u64,
}

/// A coin together with its position in the transfer chain. Identifies one holding of a coin.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WalletEntryKey<E: Pairing> {
    pub euro: EuroDescriptor<E>,
    pub transfer_count: usize,
}

impl<E: Pairing> WalletEntry<E> {
    pub fn withdrawn(digital_euro: DigitalEuro<E>, t: E::ScalarField, now_ms: u64) -> Self {
        Self {
            digital_euro,
            t,
            transaction_signature: None,
            times_spent: 0,
            received_timestamp: now_ms,
        }
    }

    /// The entry of the receiver of a validated transfer. `t` is the receiver's own randomness.
    pub fn from_transaction(
        details: &TransactionDetails<E>,
        t: E::ScalarField,
        now_ms: u64,
    ) -> Self {
        Self {
            digital_euro: details
                .digital_euro
                .with_proof(details.current_transaction_proof.proof.clone()),
            t,
            transaction_signature: Some(details.theta1_signature.clone()),
            times_spent: 0,
            received_timestamp: now_ms,
        }
    }

    pub fn is_unspent(&self) -> bool {
        self.times_spent == 0
    }

    pub fn fee_basis_points(&self, now_ms: u64, fees: &FeeConfig) -> u64 {
        fee_basis_points(
            fees,
            whole_hours_between(self.received_timestamp, now_ms),
            self.digital_euro.transfer_count() as u64,
        )
    }

    /// What the coin is worth when passed on at `now_ms`
    pub fn value_after_fee(&self, now_ms: u64, fees: &FeeConfig) -> u64 {
        value_after_fee(self.digital_euro.amount, self.fee_basis_points(now_ms, fees))
    }
}

impl<E: Pairing> Record for WalletEntry<E> {
    type Descriptor = WalletEntryKey<E>;

    fn descriptor(&self) -> Self::Descriptor {
        WalletEntryKey {
            euro: self.digital_euro.descriptor(),
            transfer_count: self.digital_euro.transfer_count(),
        }
    }
}

/// Which entry a spend takes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Spend {
    Honest,
    Double,
}

impl Spend {
    fn accepts(self, times_spent: u32) -> bool {
        match self {
            Spend::Honest => times_spent == 0,
            Spend::Double => times_spent == 1,
        }
    }
}

/// Coins of one holder. Spending marks an entry before the transfer is built, so a failed or
/// retried transfer never spends the same entry twice through the honest path.
pub struct Wallet<E: Pairing> {
    entries: Arc<dyn Repository<WalletEntry<E>>>,
    fees: FeeConfig,
}

/// What a spend needs apart from the entry
pub struct SpendContext<'a, E: Pairing> {
    pub keys: &'a KeyPair<E>,
    pub randomization_elements: &'a RandomizationElements<E>,
    pub group: &'a BilinearGroup<E>,
    pub crs: &'a Crs<E>,
    /// Transfers to a bank are deposits and are not charged a fee
    pub to_bank: bool,
    pub now_ms: u64,
}

impl<E: Pairing> Wallet<E> {
    pub fn new(entries: Arc<dyn Repository<WalletEntry<E>>>, fees: FeeConfig) -> Self {
        Self { entries, fees }
    }

    pub fn add_withdrawn(&self, digital_euro: DigitalEuro<E>, t: E::ScalarField, now_ms: u64) {
        debug!(
            serial = %digital_euro.serial_number,
            amount = digital_euro.amount,
            "withdrawn coin added to wallet"
        );
        self.entries
            .insert(WalletEntry::withdrawn(digital_euro, t, now_ms));
    }

    /// Store a received coin. `details` must have been validated.
    pub fn add_to_wallet(
        &self,
        details: &TransactionDetails<E>,
        t: E::ScalarField,
        now_ms: u64,
    ) -> WalletEntry<E> {
        let entry = WalletEntry::from_transaction(details, t, now_ms);
        debug!(
            serial = %entry.digital_euro.serial_number,
            amount = entry.digital_euro.amount,
            transfers = entry.digital_euro.transfer_count(),
            "received coin added to wallet"
        );
        self.entries.insert(entry.clone());
        entry
    }

    pub fn spend_euro<R: RngCore>(
        &self,
        rng: &mut R,
        ctx: &SpendContext<'_, E>,
    ) -> Result<TransactionDetails<E>, OfflineEuroError> {
        self.spend(rng, ctx, Spend::Honest, None)
    }

    pub fn spend_specific_euro<R: RngCore>(
        &self,
        rng: &mut R,
        euro: &DigitalEuro<E>,
        ctx: &SpendContext<'_, E>,
    ) -> Result<TransactionDetails<E>, OfflineEuroError> {
        self.spend(rng, ctx, Spend::Honest, Some(euro))
    }

    /// Spend an already spent entry once more. Only for exercising fraud detection.
    pub fn double_spend_euro<R: RngCore>(
        &self,
        rng: &mut R,
        ctx: &SpendContext<'_, E>,
    ) -> Result<TransactionDetails<E>, OfflineEuroError> {
        self.spend(rng, ctx, Spend::Double, None)
    }

    pub fn double_spend_specific_euro<R: RngCore>(
        &self,
        rng: &mut R,
        euro: &DigitalEuro<E>,
        ctx: &SpendContext<'_, E>,
    ) -> Result<TransactionDetails<E>, OfflineEuroError> {
        self.spend(rng, ctx, Spend::Double, Some(euro))
    }

    fn spend<R: RngCore>(
        &self,
        rng: &mut R,
        ctx: &SpendContext<'_, E>,
        kind: Spend,
        euro: Option<&DigitalEuro<E>>,
    ) -> Result<TransactionDetails<E>, OfflineEuroError> {
        let matches = |entry: &WalletEntry<E>| {
            kind.accepts(entry.times_spent)
                && euro.map_or(true, |e| {
                    entry.digital_euro.descriptor_equals(e)
                        && entry.digital_euro.transfer_count() == e.transfer_count()
                })
        };
        let entry = self
            .entries
            .update_first(&matches, &mut |entry| entry.times_spent += 1)
            .ok_or(OfflineEuroError::NothingToSpend)?;

        let amount = if ctx.to_bank {
            entry.digital_euro.amount
        } else {
            entry.value_after_fee(ctx.now_ms, &self.fees)
        };
        debug!(
            serial = %entry.digital_euro.serial_number,
            times_spent = entry.times_spent,
            amount,
            "spending coin"
        );
        let spent = WalletEntry {
            digital_euro: entry.digital_euro.with_amount(amount),
            ..entry
        };
        create_transaction(
            rng,
            ctx.keys,
            &spent,
            ctx.randomization_elements,
            ctx.group,
            ctx.crs,
        )
    }

    /// Sum over the unspent coins
    pub fn balance(&self) -> u64 {
        self.entries
            .query(&|e| e.is_unspent())
            .iter()
            .map(|e| e.digital_euro.amount)
            .sum()
    }

    pub fn entries(&self) -> Vec<WalletEntry<E>> {
        self.entries.all()
    }

    pub fn fees(&self) -> &FeeConfig {
        &self.fees
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
