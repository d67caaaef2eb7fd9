//! Ledger encodings of the simulator's types: address bytes, the transaction
//! body and the transaction id derived from it.
//!
//! Everything here converts into the ledger library's own types
//! (`pallas_addresses`, `pallas_primitives::babbage`) and lets them produce
//! the bytes, so ids and address encodings agree with any client built on
//! the same library.

use pallas_addresses::{
    Network as LedgerNetwork, Pointer, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
    StakeAddress,
};
use pallas_codec::minicbor;
use pallas_codec::utils::{Bytes, CborWrap, KeyValuePairs};
use pallas_crypto::hash::Hash;
use pallas_primitives::babbage::{
    Certificate as LedgerCertificate, DatumOption as LedgerDatum, PostAlonzoTransactionOutput,
    PseudoScript, TransactionBody as LedgerBody, TransactionInput, TransactionOutput as LedgerOutput,
    Value as LedgerValue,
};
use pallas_primitives::{PlutusData as LedgerData, PlutusScript, StakeCredential};

use crate::hash::blake2b_256;
use crate::types::*;

fn ledger_network(network: Network) -> LedgerNetwork {
    match network {
        Network::Testnet => LedgerNetwork::Testnet,
        Network::Mainnet => LedgerNetwork::Mainnet,
    }
}

fn payment_part(credential: &Credential) -> ShelleyPaymentPart {
    match credential {
        Credential::Key(h) => ShelleyPaymentPart::Key(Hash::from(*h)),
        Credential::Script(h) => ShelleyPaymentPart::Script(Hash::from(*h)),
    }
}

fn delegation_part(staking: Option<&StakingCredential>) -> ShelleyDelegationPart {
    match staking {
        Some(StakingCredential::Hash(Credential::Key(h))) => ShelleyDelegationPart::Key(Hash::from(*h)),
        Some(StakingCredential::Hash(Credential::Script(h))) => {
            ShelleyDelegationPart::Script(Hash::from(*h))
        }
        Some(StakingCredential::Pointer { slot, tx_index, cert_index }) => {
            ShelleyDelegationPart::Pointer(Pointer::new(*slot, *tx_index, *cert_index))
        }
        None => ShelleyDelegationPart::Null,
    }
}

/// The address as the ledger library models it
pub fn ledger_address(address: &Address) -> ShelleyAddress {
    ShelleyAddress::new(
        ledger_network(address.network),
        payment_part(&address.payment),
        delegation_part(address.staking.as_ref()),
    )
}

/// Raw address bytes: header ‖ payment hash ‖ staking part
pub fn address_bytes(address: &Address) -> Vec<u8> {
    ledger_address(address).to_vec()
}

/// Raw reward address bytes: header ‖ stake credential hash
pub fn reward_address_bytes(address: &RewardAddress) -> Vec<u8> {
    let carrier = Address::base(address.network, address.credential, address.credential);
    // A hash delegation part always yields a stake address
    StakeAddress::try_from(ledger_address(&carrier))
        .map(|stake| stake.to_vec())
        .unwrap_or_default()
}

/// Withdrawals ordered by their reward-address encoding, the order in which
/// withdrawal redeemer indices are assigned
pub fn sorted_withdrawals(withdrawals: &[(RewardAddress, Coin)]) -> Vec<(RewardAddress, Coin)> {
    let mut sorted = withdrawals.to_vec();
    sorted.sort_by_key(|(addr, _)| reward_address_bytes(addr));
    sorted
}

fn ledger_input(r: &OutputRef) -> TransactionInput {
    TransactionInput {
        transaction_id: Hash::from(r.tx_id),
        index: r.index as u64,
    }
}

fn ledger_multi_asset<A: Clone>(
    multi_asset: &MultiAsset,
    quantity: impl Fn(i64) -> A,
) -> KeyValuePairs<Hash<28>, KeyValuePairs<Bytes, A>> {
    KeyValuePairs::from(
        multi_asset
            .iter()
            .map(|(policy, assets)| {
                let assets = assets
                    .iter()
                    .map(|(name, q)| (Bytes::from(name.clone()), quantity(*q)))
                    .collect::<Vec<_>>();
                (Hash::from(*policy), KeyValuePairs::from(assets))
            })
            .collect::<Vec<_>>(),
    )
}

fn ledger_value(value: &Value) -> LedgerValue {
    if value.multi_asset.is_empty() {
        return LedgerValue::Coin(value.coin);
    }
    // Negative output quantities are rejected before submission
    let assets = ledger_multi_asset(&value.multi_asset, |q| u64::try_from(q).unwrap_or(0));
    LedgerValue::Multiasset(value.coin, assets)
}

fn stake_credential(credential: &Credential) -> StakeCredential {
    match credential {
        Credential::Key(h) => StakeCredential::AddrKeyhash(Hash::from(*h)),
        Credential::Script(h) => StakeCredential::ScriptHash(Hash::from(*h)),
    }
}

fn ledger_certificate(certificate: &Certificate) -> LedgerCertificate {
    match certificate {
        Certificate::StakeRegistration(c) => LedgerCertificate::StakeRegistration(stake_credential(c)),
        Certificate::StakeDeregistration(c) => LedgerCertificate::StakeDeregistration(stake_credential(c)),
        Certificate::StakeDelegation { credential, pool } => {
            LedgerCertificate::StakeDelegation(stake_credential(credential), Hash::from(*pool))
        }
    }
}

fn ledger_output(output: &TransactionOutput) -> LedgerOutput {
    let datum_option = output.datum.as_ref().map(|datum| match datum {
        DatumOption::Hash(h) => LedgerDatum::Hash(Hash::from(*h)),
        DatumOption::Inline(d) => LedgerDatum::Data(CborWrap(LedgerData::from(d))),
    });
    let script_ref = output.script_ref.as_ref().map(|script| {
        let bytes = Bytes::from(script.bytes.clone());
        CborWrap(match script.version {
            PlutusVersion::V1 => PseudoScript::PlutusV1Script(PlutusScript::<1>(bytes)),
            PlutusVersion::V2 => PseudoScript::PlutusV2Script(PlutusScript::<2>(bytes)),
        })
    });
    LedgerOutput::PostAlonzo(PostAlonzoTransactionOutput {
        address: Bytes::from(address_bytes(&output.address)),
        value: ledger_value(&output.amount),
        datum_option,
        script_ref,
    })
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// The transaction body as the ledger library models it
pub fn ledger_body(body: &TransactionBody) -> LedgerBody {
    let withdrawals = sorted_withdrawals(&body.withdrawals)
        .iter()
        .map(|(addr, coin)| (Bytes::from(reward_address_bytes(addr)), *coin))
        .collect::<Vec<_>>();

    LedgerBody {
        inputs: body.inputs.iter().map(ledger_input).collect(),
        outputs: body.outputs.iter().map(ledger_output).collect(),
        fee: body.fee,
        ttl: body.ttl,
        certificates: non_empty(body.certificates.iter().map(ledger_certificate).collect()),
        withdrawals: non_empty(withdrawals).map(KeyValuePairs::from),
        update: None,
        auxiliary_data_hash: None,
        validity_interval_start: body.validity_start,
        mint: (!body.mint.is_empty()).then(|| ledger_multi_asset(&body.mint, |q| q)),
        script_data_hash: None,
        collateral: None,
        required_signers: non_empty(body.required_signers.iter().map(|h| Hash::from(*h)).collect()),
        network_id: None,
        collateral_return: None,
        total_collateral: None,
        reference_inputs: non_empty(body.reference_inputs.iter().map(ledger_input).collect()),
    }
}

/// CBOR encoding of a transaction body
pub fn body_cbor(body: &TransactionBody) -> Vec<u8> {
    // Encoding into a Vec can not fail
    minicbor::to_vec(ledger_body(body)).unwrap_or_default()
}

/// Transaction id: blake2b_256 of the body encoding
pub fn tx_id(body: &TransactionBody) -> TxId {
    blake2b_256(&body_cbor(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallas_addresses::Address as LedgerAddress;

    #[test]
    fn test_enterprise_key_address_header() {
        let addr = Address::enterprise(Network::Testnet, Credential::Key([1; 28]));
        let bytes = address_bytes(&addr);
        assert_eq!(bytes[0], 0x60);
        assert_eq!(bytes.len(), 29);
    }

    #[test]
    fn test_base_script_address_header() {
        let addr = Address::base(Network::Mainnet, Credential::Script([1; 28]), Credential::Key([2; 28]));
        let bytes = address_bytes(&addr);
        assert_eq!(bytes[0], 0x11);
        assert_eq!(bytes.len(), 57);
    }

    #[test]
    fn test_pointer_address_varints() {
        let addr = Address {
            network: Network::Testnet,
            payment: Credential::Key([0; 28]),
            staking: Some(StakingCredential::Pointer { slot: 128, tx_index: 2, cert_index: 0 }),
        };
        let bytes = address_bytes(&addr);
        assert_eq!(bytes[0], 0x40);
        assert_eq!(&bytes[29..], &[0x81, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_address_bytes_parse_back() {
        let addr = Address::base(Network::Testnet, Credential::Key([4; 28]), Credential::Script([5; 28]));
        match LedgerAddress::from_bytes(&address_bytes(&addr)) {
            Ok(LedgerAddress::Shelley(parsed)) => assert_eq!(parsed, ledger_address(&addr)),
            other => panic!("expected a shelley address, got {:?}", other),
        }
    }

    #[test]
    fn test_reward_address_header() {
        let key = RewardAddress::new(Network::Testnet, Credential::Key([7; 28]));
        let script = RewardAddress::new(Network::Mainnet, Credential::Script([7; 28]));
        let key_bytes = reward_address_bytes(&key);
        assert_eq!(key_bytes[0], 0xe0);
        assert_eq!(&key_bytes[1..], &[7; 28]);
        assert_eq!(reward_address_bytes(&script)[0], 0xf1);
    }

    #[test]
    fn test_reward_address_ordering_puts_key_before_script() {
        let script = RewardAddress::new(Network::Testnet, Credential::Script([0; 28]));
        let key = RewardAddress::new(Network::Testnet, Credential::Key([0xff; 28]));
        let sorted = sorted_withdrawals(&[(script, 1), (key, 2)]);
        assert_eq!(sorted[0].0, key);
        assert_eq!(sorted[1].0, script);
    }

    #[test]
    fn test_minimal_body_encoding() {
        let body = TransactionBody {
            inputs: vec![OutputRef::new([1; 32], 0)],
            fee: 10,
            ..Default::default()
        };
        let mut expected = vec![0xa3, 0x00, 0x81, 0x82, 0x58, 0x20];
        expected.extend_from_slice(&[1; 32]);
        expected.extend_from_slice(&[0x00, 0x01, 0x80, 0x02, 0x0a]);
        assert_eq!(body_cbor(&body), expected);
        assert_eq!(tx_id(&body), blake2b_256(&expected));
    }

    #[test]
    fn test_tx_id_changes_with_body() {
        let mut body = TransactionBody {
            inputs: vec![OutputRef::new([1; 32], 0)],
            fee: 10,
            ..Default::default()
        };
        let first = tx_id(&body);
        body.fee = 11;
        assert_ne!(first, tx_id(&body));
        body.required_signers.push([3; 28]);
        body.mint = Value::default().with_asset([2; 28], b"t".to_vec(), -1).multi_asset;
        assert_ne!(tx_id(&body), first);
    }
}
