//! Stake account rules exercised through transaction submission

use plutus_bench::*;
use std::sync::{Arc, Mutex};

fn init_logger() {
    let _ = simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
}

fn ledger() -> MockLedger {
    MockLedger::with_interpreter(NativeValidators::new())
}

/// Transaction signed by `user` spending `input` with the given stake actions
fn stake_tx(
    user: &MockUser,
    input: OutputRef,
    certificates: Vec<Certificate>,
    withdrawals: Vec<(RewardAddress, Coin)>,
) -> Transaction {
    Transaction::new(
        TransactionBody {
            inputs: vec![input],
            outputs: vec![TransactionOutput::new(user.address, Value::lovelace(1))],
            certificates,
            withdrawals,
            ..Default::default()
        },
        WitnessSet {
            vkey_witnesses: vec![user.witness()],
            ..Default::default()
        },
    )
}

fn registered_and_delegated(ledger: &mut MockLedger) -> (MockUser, MockPool) {
    let pool = MockPool::new(ledger);
    let user = MockUser::new(ledger);
    let input = user.fund(ledger, Value::lovelace(10));
    let tx = stake_tx(
        &user,
        input,
        vec![
            Certificate::StakeRegistration(user.credential()),
            Certificate::StakeDelegation {
                credential: user.credential(),
                pool: pool.pool_id,
            },
        ],
        vec![],
    );
    ledger.submit_tx(&tx).unwrap();
    (user, pool)
}

#[test]
fn test_register_delegate_withdraw() {
    init_logger();
    let mut ledger = ledger();
    let (user, pool) = registered_and_delegated(&mut ledger);
    let stake = user.reward_address();

    let account = ledger.account(&stake).unwrap();
    assert!(account.registered);
    assert_eq!(account.delegated_pool, Some(pool.pool_id));
    assert_eq!(account.accrued_rewards, 0);

    assert_eq!(ledger.distribute_rewards(500), 1);
    let input = user.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&user, input, vec![], vec![(stake, 500)]);
    ledger.submit_tx(&tx).unwrap();
    assert_eq!(ledger.account(&stake).unwrap().accrued_rewards, 0);
}

#[test]
fn test_partial_withdrawal_rejected() {
    init_logger();
    let mut ledger = ledger();
    let (user, _) = registered_and_delegated(&mut ledger);
    let stake = user.reward_address();
    ledger.distribute_rewards(500);

    let input = user.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&user, input, vec![], vec![(stake, 200)]);
    assert_eq!(
        ledger.submit_tx(&tx),
        Err(LedgerError::PartialWithdrawal {
            address: stake,
            requested: 200,
            available: 500,
        })
    );
    assert_eq!(ledger.account(&stake).unwrap().accrued_rewards, 500);
    assert!(ledger.utxo(&input).is_ok());
}

#[test]
fn test_withdrawal_requires_witness() {
    init_logger();
    let mut ledger = ledger();
    let (user, _) = registered_and_delegated(&mut ledger);
    let stake = user.reward_address();
    ledger.distribute_rewards(500);

    let input = user.fund(&mut ledger, Value::lovelace(10));
    let mut tx = stake_tx(&user, input, vec![], vec![(stake, 500)]);
    tx.witness_set.vkey_witnesses.clear();
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::UnauthorizedStakeAction(stake)));
    assert_eq!(ledger.account(&stake).unwrap().accrued_rewards, 500);
}

#[test]
fn test_delegation_without_registration() {
    init_logger();
    let mut ledger = ledger();
    let pool = MockPool::new(&mut ledger);
    let user = MockUser::new(&mut ledger);
    let stake = user.reward_address();
    let input = user.fund(&mut ledger, Value::lovelace(10));

    let delegation = Certificate::StakeDelegation {
        credential: user.credential(),
        pool: pool.pool_id,
    };
    let tx = stake_tx(&user, input, vec![delegation.clone()], vec![]);
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::NotRegistered(stake)));
    assert_eq!(ledger.account(&stake), Err(LedgerError::AccountNotFound(stake)));
    assert!(ledger.utxo(&input).is_ok());

    // Certificates apply in body order: delegating before registering fails
    let tx = stake_tx(
        &user,
        input,
        vec![delegation, Certificate::StakeRegistration(user.credential())],
        vec![],
    );
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::NotRegistered(stake)));
}

#[test]
fn test_delegation_to_unknown_pool_rolls_back_registration() {
    init_logger();
    let mut ledger = ledger();
    let user = MockUser::new(&mut ledger);
    let stake = user.reward_address();
    let input = user.fund(&mut ledger, Value::lovelace(10));
    let unknown = [0xab; 28];

    let tx = stake_tx(
        &user,
        input,
        vec![
            Certificate::StakeRegistration(user.credential()),
            Certificate::StakeDelegation {
                credential: user.credential(),
                pool: unknown,
            },
        ],
        vec![],
    );
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::UnknownPool(unknown)));
    assert!(!ledger.stake_registry().is_registered(&stake));
    assert!(ledger.utxo(&input).is_ok());
}

#[test]
fn test_double_registration_rejected() {
    init_logger();
    let mut ledger = ledger();
    let (user, _) = registered_and_delegated(&mut ledger);
    let stake = user.reward_address();

    let input = user.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&user, input, vec![Certificate::StakeRegistration(user.credential())], vec![]);
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::AlreadyRegistered(stake)));
    assert!(ledger.utxo(&input).is_ok());
    assert!(ledger.account(&stake).unwrap().delegated_pool.is_some());
}

#[test]
fn test_deregistration_requires_empty_rewards() {
    init_logger();
    let mut ledger = ledger();
    let (user, _) = registered_and_delegated(&mut ledger);
    let stake = user.reward_address();
    ledger.distribute_rewards(5);

    let input = user.fund(&mut ledger, Value::lovelace(10));
    let deregistration = Certificate::StakeDeregistration(user.credential());
    let tx = stake_tx(&user, input, vec![deregistration.clone()], vec![]);
    assert_eq!(ledger.submit_tx(&tx), Err(LedgerError::RewardsNotWithdrawn(stake)));

    // Withdrawals apply after certificates, so drain first
    let drain = stake_tx(&user, input, vec![], vec![(stake, 5)]);
    ledger.submit_tx(&drain).unwrap();

    let input = user.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&user, input, vec![deregistration], vec![]);
    ledger.submit_tx(&tx).unwrap();
    let account = ledger.account(&stake).unwrap();
    assert!(!account.registered);
    assert_eq!(account.delegated_pool, None);
}

#[test]
fn test_script_credential_stake_actions() {
    init_logger();
    let script = Script::new(PlutusVersion::V2, vec![0x41, 0x70]);
    let purposes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&purposes);
    let validators = NativeValidators::new().with(&script, move |args| {
        seen.lock().unwrap().push(args.purpose().clone());
        Ok(())
    });
    let mut ledger = MockLedger::with_interpreter(validators);
    let pool = MockPool::new(&mut ledger);
    let user = MockUser::new(&mut ledger);
    let credential = Credential::Script(script.hash());
    let stake = RewardAddress::new(ledger.network(), credential);
    let delegation = Certificate::StakeDelegation { credential, pool: pool.pool_id };

    // Delegation by a script credential needs its redeemer
    let input = user.fund(&mut ledger, Value::lovelace(10));
    let mut tx = stake_tx(
        &user,
        input,
        vec![Certificate::StakeRegistration(credential), delegation.clone()],
        vec![],
    );
    tx.witness_set.plutus_v2_scripts.push(script.bytes.clone());
    assert_eq!(
        ledger.submit_tx(&tx),
        Err(LedgerError::MissingRedeemer(RedeemerKey::new(RedeemerTag::Cert, 1)))
    );

    // Registration runs no script; delegation does
    tx.witness_set
        .redeemers
        .push(Redeemer::new(RedeemerTag::Cert, 1, PlutusData::unit()));
    let report = ledger.evaluate_tx(&tx).unwrap();
    assert_eq!(report.len(), 1);
    assert!(report.get(&RedeemerKey::new(RedeemerTag::Cert, 1)).is_some());
    ledger.submit_tx(&tx).unwrap();
    assert_eq!(
        purposes.lock().unwrap().last(),
        Some(&ScriptPurpose::Certifying(delegation))
    );

    ledger.distribute_rewards(100);
    let input = user.fund(&mut ledger, Value::lovelace(10));
    let mut tx = stake_tx(&user, input, vec![], vec![(stake, 100)]);
    tx.witness_set.plutus_v2_scripts.push(script.bytes.clone());
    tx.witness_set
        .redeemers
        .push(Redeemer::new(RedeemerTag::Reward, 0, PlutusData::unit()));
    ledger.submit_tx(&tx).unwrap();
    assert_eq!(
        purposes.lock().unwrap().last(),
        Some(&ScriptPurpose::Rewarding(StakingCredential::Hash(credential)))
    );
    assert_eq!(ledger.account(&stake).unwrap().accrued_rewards, 0);
}

#[test]
fn test_rewards_only_reach_delegated_accounts() {
    init_logger();
    let mut ledger = ledger();
    let (delegated, _) = registered_and_delegated(&mut ledger);
    let idle = MockUser::new(&mut ledger);
    let input = idle.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&idle, input, vec![Certificate::StakeRegistration(idle.credential())], vec![]);
    ledger.submit_tx(&tx).unwrap();

    assert_eq!(ledger.distribute_rewards(7), 1);
    assert_eq!(ledger.account(&delegated.reward_address()).unwrap().accrued_rewards, 7);
    assert_eq!(ledger.account(&idle.reward_address()).unwrap().accrued_rewards, 0);
}

#[test]
fn test_withdrawal_from_other_network_rejected() {
    init_logger();
    let mut ledger = ledger();
    let (user, _) = registered_and_delegated(&mut ledger);
    ledger.distribute_rewards(50);
    assert_eq!(ledger.network(), Network::Testnet);

    let foreign = RewardAddress::new(Network::Mainnet, user.credential());
    let input = user.fund(&mut ledger, Value::lovelace(10));
    let tx = stake_tx(&user, input, vec![], vec![(foreign, 50)]);
    assert_eq!(
        ledger.submit_tx(&tx),
        Err(LedgerError::WrongNetwork {
            address: foreign,
            expected: Network::Testnet,
        })
    );
    assert_eq!(ledger.account(&user.reward_address()).unwrap().accrued_rewards, 50);
    assert!(ledger.utxo(&input).is_ok());
}
