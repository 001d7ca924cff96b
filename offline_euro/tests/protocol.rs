mod common;

use ark_bls12_381::{Bls12_381, Fr};
use ark_std::UniformRand;
use common::{World, BANK, P};
use ecash_crypto_utils::serde_utils::to_compressed_bytes;
use groth_sahai::RandomizationElements;
use offline_euro::{
    participant::RANDOMNESS_NOT_FOUND,
    prelude::*,
    transaction::create_transaction,
};
use std::{
    sync::Barrier,
    thread,
    time::{Duration, Instant},
};
use test_utils::seeded_rng;

const DEPOSIT_ACCEPTED: &str = "Deposit was successful!";

#[test]
fn withdraw_transfer_and_deposit() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    let carol = world.user("carol");
    let alice_user = alice.as_user().unwrap();

    let euro = alice_user.withdraw_digital_euro(BANK, 200).unwrap();
    assert_eq!(euro.amount, 200);
    assert!(euro.proofs.is_empty());
    assert_eq!(alice_user.balance(), 200);

    assert_eq!(alice_user.send_digital_euro_to("bob").unwrap(), "Valid transaction");
    assert_eq!(alice_user.balance(), 0);
    let bob_user = bob.as_user().unwrap();
    assert_eq!(bob_user.balance(), 198);
    let received = bob_user.wallet().entries();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].digital_euro.proofs.len(), 1);
    assert_eq!(received[0].times_spent, 0);
    assert!(received[0].digital_euro.descriptor_equals(&euro));

    // One earlier transfer adds to the fee
    assert_eq!(bob_user.send_digital_euro_to("carol").unwrap(), "Valid transaction");
    let carol_user = carol.as_user().unwrap();
    assert_eq!(carol_user.balance(), 194);

    // No fee towards the bank
    assert_eq!(carol_user.send_digital_euro_to(BANK).unwrap(), DEPOSIT_ACCEPTED);
    assert_eq!(carol_user.balance(), 0);
    let deposited = world.bank().deposited_euros();
    assert_eq!(deposited.len(), 1);
    assert_eq!(deposited[0].amount, 194);
    assert_eq!(deposited[0].proofs.len(), 3);
    let log = world.bank().deposit_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].serial_number, euro.serial_number);
    assert!(!log[0].double_spending_suspected);
}

#[test]
fn double_spender_is_traced() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    let carol = world.user("carol");
    let alice_user = alice.as_user().unwrap();

    let euro = alice_user.withdraw_digital_euro(BANK, 100).unwrap();
    assert_eq!(
        alice_user
            .send_specific_digital_euro_to(&euro, "bob")
            .unwrap(),
        "Valid transaction"
    );
    // Nothing distinguishes the copy for its receiver
    assert_eq!(
        alice_user
            .double_spend_specific_digital_euro_to(&euro, "carol")
            .unwrap(),
        "Valid transaction"
    );
    assert_eq!(bob.as_user().unwrap().balance(), 99);
    assert_eq!(carol.as_user().unwrap().balance(), 99);

    assert_eq!(
        bob.as_user().unwrap().send_digital_euro_to(BANK).unwrap(),
        DEPOSIT_ACCEPTED
    );
    let verdict = carol.as_user().unwrap().send_digital_euro_to(BANK).unwrap();
    let alice_pk = hex::encode(to_compressed_bytes(&alice.public_key().unwrap()).unwrap());
    assert_eq!(
        verdict,
        format!(
            "Double spending detected. Double spender is alice with PK: {}",
            alice_pk
        )
    );

    let log = world.bank().deposit_log();
    assert_eq!(log.len(), 2);
    assert!(!log[0].double_spending_suspected);
    assert!(log[1].double_spending_suspected);
    // Both copies are kept
    assert_eq!(world.bank().deposited_euros().len(), 2);
}

#[test]
fn concurrent_deposits_of_one_coin() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    for amount in 1..=10 {
        let euro = alice
            .as_user()
            .unwrap()
            .withdraw_digital_euro(BANK, amount)
            .unwrap();
        let barrier = Barrier::new(2);
        let outcomes = thread::scope(|s| {
            let handles = (0..2)
                .map(|_| {
                    let (euro, barrier, bank) = (euro.clone(), &barrier, world.bank());
                    s.spawn(move || {
                        barrier.wait();
                        bank.deposit_euro(euro)
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        let accepted = outcomes
            .iter()
            .filter(|o| **o == DepositOutcome::Accepted)
            .count();
        assert_eq!(accepted, 1, "{:?}", outcomes);
        assert!(outcomes.contains(&DepositOutcome::DoubleSpendUnattributed));
    }
    let log = world.bank().deposit_log();
    assert_eq!(log.len(), 20);
    assert_eq!(log.iter().filter(|e| e.double_spending_suspected).count(), 10);
}

#[test]
fn fraud_verdicts() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    alice.as_user().unwrap().withdraw_digital_euro(BANK, 50).unwrap();
    alice.as_user().unwrap().send_digital_euro_to("bob").unwrap();

    let entry = &bob.as_user().unwrap().wallet().entries()[0];
    let proof = &entry.digital_euro.proofs[0];
    let verdict = world.ttp().get_user_from_proofs(proof, proof);
    assert_eq!(
        verdict,
        FraudVerdict::DoubleSpender(world.ttp().get_user_from_proof(proof).unwrap())
    );
    assert_eq!(
        world.ttp().get_user_from_proof(proof).unwrap().public_key,
        alice.public_key().unwrap()
    );

    bob.as_user().unwrap().send_digital_euro_to("alice").unwrap();
    let entry = &alice.as_user().unwrap().wallet().entries()[1];
    let verdict = world
        .ttp()
        .get_user_from_proofs(&entry.digital_euro.proofs[0], &entry.digital_euro.proofs[1]);
    assert_eq!(verdict, FraudVerdict::NoDoubleSpending);
    assert_eq!(verdict.description(), "No double spending detected");
}

#[test]
fn unreachable_ttp_during_fraud_control() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    let carol = world.user("carol");
    let alice_user = alice.as_user().unwrap();

    alice_user.withdraw_digital_euro(BANK, 100).unwrap();
    alice_user.send_digital_euro_to("bob").unwrap();
    alice_user.double_spend_digital_euro_to("carol").unwrap();
    bob.as_user().unwrap().send_digital_euro_to(BANK).unwrap();

    // Resolved while the TTP is still around
    carol.core().lookup_address(BANK).unwrap();
    assert!(world.network.detach("TTP"));
    assert_eq!(
        carol.as_user().unwrap().send_digital_euro_to(BANK).unwrap(),
        "Found double spending proofs, but TTP is unreachable"
    );
    assert!(world.bank().deposit_log()[1].double_spending_suspected);

    // The TTP is only unreachable, nothing about it is lost
    assert!(world.network.reattach("TTP"));
    assert_eq!(world.ttp().registered_users().len(), 3);
}

#[test]
fn unknown_peers_and_misuse() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    let alice_user = alice.as_user().unwrap();

    assert!(matches!(
        alice_user.send_digital_euro_to("nobody"),
        Err(OfflineEuroError::UnknownIdentity(name)) if name == "nobody"
    ));
    assert!(matches!(
        alice_user.withdraw_digital_euro("nobody", 10),
        Err(OfflineEuroError::UnknownIdentity(_))
    ));
    assert!(matches!(
        alice_user.withdraw_digital_euro("bob", 10),
        Err(OfflineEuroError::ProtocolMisuse(MisuseKind::NotABank))
    ));
    assert!(matches!(
        alice_user.withdraw_digital_euro(BANK, 0),
        Err(OfflineEuroError::InvalidAmount)
    ));
    assert!(matches!(
        alice_user.send_digital_euro_to("bob"),
        Err(OfflineEuroError::NothingToSpend)
    ));
    assert!(matches!(
        alice_user.send_digital_euro_to("alice"),
        Err(OfflineEuroError::ProtocolMisuse(MisuseKind::SelfAddressed))
    ));
    assert!(matches!(
        alice
            .core()
            .notify("nobody", Message::GroupDescriptionCrsRequest),
        Err(OfflineEuroError::UnknownIdentity(_))
    ));

    // A user that never set up has no keys
    let stranger = Participant::<Bls12_381>::new_user(
        "stranger",
        &world.network,
        common::test_config(),
        seeded_rng(99),
    );
    assert!(!stranger.core().is_set_up());
    assert!(matches!(
        stranger.as_user().unwrap().withdraw_digital_euro(BANK, 10),
        Err(OfflineEuroError::ProtocolMisuse(MisuseKind::NotSetUp))
    ));
    assert_eq!(bob.as_user().unwrap().balance(), 0);
}

#[test]
fn failures_and_unanswered_replies() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let public_key = alice.public_key().unwrap();

    // Joined but never fetched the parameters, so it cannot answer
    let idle_bank = P::new_bank("Idle bank", &world.network, common::test_config(), seeded_rng(98));
    let reply = alice.core().request(
        "Idle bank",
        Message::BlindSignatureRandomnessRequest { public_key },
    );
    match reply {
        Err(OfflineEuroError::PeerFailed { peer, reason }) => {
            assert_eq!(peer, "Idle bank");
            assert!(reason.contains("NotSetUp"), "{}", reason);
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert_eq!(world.network.pending_replies(), 0);

    // An answer to a notification is not kept around
    alice
        .core()
        .notify(common::TTP, Message::GroupDescriptionCrsRequest)
        .unwrap();
    assert_eq!(world.network.pending_replies(), 0);
    assert!(!idle_bank.core().is_set_up());
}

#[test]
fn blind_signature_randomness() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let alice_pk = alice.public_key().unwrap();
    let bank = world.bank();

    let first = bank.get_blind_signature_randomness(alice_pk).unwrap();
    assert_eq!(bank.get_blind_signature_randomness(alice_pk).unwrap(), first);

    let mut rng = seeded_rng(5);
    let challenge = Fr::rand(&mut rng);
    let response = bank
        .create_blind_signature(&challenge, &alice_pk, 10, "serial")
        .unwrap();
    assert!(!response.is_sentinel());
    assert_eq!(response.bank_public_key, world.bank.public_key().unwrap());

    // The randomness was used up
    let response = bank
        .create_blind_signature(&challenge, &alice_pk, 10, "serial")
        .unwrap();
    assert!(response.is_sentinel());
    assert_ne!(bank.get_blind_signature_randomness(alice_pk).unwrap(), first);

    let metadata = bank.withdrawal_metadata().unwrap();
    assert_eq!(metadata.bank_public_key, world.bank.public_key().unwrap());
    assert!(bank.is_registered());
}

#[test]
fn transactions_need_the_receivers_randomness() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let bob = world.user("bob");
    alice.as_user().unwrap().withdraw_digital_euro(BANK, 20).unwrap();

    let session = alice.core().session().unwrap();
    let entry = alice.as_user().unwrap().wallet().entries().remove(0);
    let mut rng = seeded_rng(7);
    let elements = RandomizationElements::derive(&Fr::rand(&mut rng), &session.crs);
    let details = create_transaction(
        &mut rng,
        &session.keys,
        &entry,
        &elements,
        &session.group,
        &session.crs,
    )
    .unwrap();

    assert_eq!(
        bob.on_received_transaction(&details).unwrap(),
        RANDOMNESS_NOT_FOUND
    );

    // Bob handed out other elements than the ones used
    bob.core()
        .generate_randomization_elements(session.keys.public_key)
        .unwrap();
    assert_eq!(
        bob.on_received_transaction(&details).unwrap(),
        TransactionResult::RandomizationMismatch.description()
    );
    // The randomness was taken by the rejected attempt
    assert_eq!(
        bob.on_received_transaction(&details).unwrap(),
        RANDOMNESS_NOT_FOUND
    );
    assert_eq!(bob.as_user().unwrap().balance(), 0);
}

#[test]
fn registration_completes_later() {
    let mut world = World::new(false);
    let dave = world.pending_user("dave");
    let dave_user = dave.as_user().unwrap();
    assert_eq!(
        dave_user.registration_state(),
        Some(RegistrationState::PendingVerification)
    );
    let challenge = dave_user.verification_challenge().unwrap();
    let pending = world.ttp().pending_registrations();
    assert_eq!(pending.len(), 1);
    assert!(challenge.ends_with(&pending[0].transaction_id));
    assert!(world.ttp().registered_users().is_empty());

    // Polled once while the verification is open
    dave_user.submit_verification().unwrap();
    assert_eq!(
        dave_user.registration_state(),
        Some(RegistrationState::PendingVerification)
    );

    assert!(world.identity.approve(&pending[0].transaction_id));
    assert_eq!(
        world.ttp().poll_pending_registrations(),
        vec![("dave".to_string(), RegistrationState::Verified)]
    );
    assert_eq!(dave_user.registration_state(), Some(RegistrationState::Verified));
    let registered = world.ttp().registered_users();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].legal_name.as_deref(), Some("dave"));
    assert_eq!(registered[0].public_key, dave.public_key().unwrap());
    assert!(world.ttp().pending_registrations().is_empty());

    let eve = world.pending_user("eve");
    let transaction_id = world.ttp().pending_registrations()[0].transaction_id.clone();
    assert!(world.identity.reject(&transaction_id, "document expired"));
    eve.as_user().unwrap().submit_verification().unwrap();
    assert_eq!(
        eve.as_user().unwrap().registration_state(),
        Some(RegistrationState::Rejected)
    );
    assert_eq!(world.ttp().registered_users().len(), 1);
}

#[test]
fn submitting_verification_does_not_wait_for_the_outcome() {
    let config = ProtocolConfig::from_toml_str(
        r#"
        ttp_name = "TTP"

        [network]
        reply_timeout_ms = 200

        [identity]
        max_polls = 150
        poll_backoff_ms = 60000
        "#,
    )
    .unwrap();
    let mut world = World::with_ttp_config(false, config);
    let frank = world.pending_user("frank");
    let frank_user = frank.as_user().unwrap();

    let started = Instant::now();
    frank_user.submit_verification().unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        frank_user.registration_state(),
        Some(RegistrationState::PendingVerification)
    );
    assert_eq!(world.ttp().pending_registrations().len(), 1);

    // Settled on the first round, so no backoff
    let transaction_id = world.ttp().pending_registrations()[0].transaction_id.clone();
    assert!(world.identity.approve(&transaction_id));
    let started = Instant::now();
    assert_eq!(
        world.ttp().poll_pending_registrations(),
        vec![("frank".to_string(), RegistrationState::Verified)]
    );
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(frank_user.registration_state(), Some(RegistrationState::Verified));
    assert!(world.ttp().poll_pending_registrations().is_empty());
}

#[test]
fn reset_clears_stores() {
    let mut world = World::new(true);
    let alice = world.user("alice");
    let alice_user = alice.as_user().unwrap();
    alice_user.withdraw_digital_euro(BANK, 30).unwrap();
    alice_user.withdraw_digital_euro(BANK, 40).unwrap();
    assert_eq!(alice_user.balance(), 70);
    alice_user.send_digital_euro_to(BANK).unwrap();
    assert_eq!(world.bank().deposited_euros().len(), 1);

    let public_key = alice.public_key();
    alice.reset();
    assert_eq!(alice_user.balance(), 0);
    assert!(alice_user.wallet().entries().is_empty());
    assert_eq!(alice.public_key(), public_key);

    world.bank.reset();
    assert!(world.bank().deposited_euros().is_empty());
    assert!(world.bank().deposit_log().is_empty());
    assert!(world.bank().is_registered());

    // Still able to transact after the reset
    alice_user.withdraw_digital_euro(BANK, 10).unwrap();
    assert_eq!(alice_user.balance(), 10);
}
