//! Call-Identifier Codec Tests

use ethers::types::H256;
use fabstir_wallet_bridge::protocol::{CallIdError, CallIdentifier, CallKind, CALL_ID_SIZE};
use rand::{rngs::OsRng, RngCore};

fn random_hash() -> H256 {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    H256::from(bytes)
}

#[test]
fn test_decode_inverts_encode_across_ranges() {
    let chain_ids = [0u64, 1, 8453, 84532, u32::MAX as u64, u64::MAX];
    for chain_id in chain_ids {
        for kind in [CallKind::Operation, CallKind::Transaction] {
            let id = CallIdentifier::new(chain_id, kind, random_hash());
            assert_eq!(CallIdentifier::decode(&id.encode()).unwrap(), id);
        }
    }
}

#[test]
fn test_encoded_layout() {
    let hash = H256::repeat_byte(0xcd);
    let id = CallIdentifier::new(0x0102, CallKind::Transaction, hash);
    let bytes = id.to_bytes();

    assert_eq!(bytes.len(), CALL_ID_SIZE);
    assert_eq!(bytes[0], 1, "Kind byte comes first");
    assert_eq!(&bytes[1..33], hash.as_bytes());
    assert_eq!(&bytes[33..41], &0x0102u64.to_be_bytes());
    assert!(bytes[41..].iter().all(|b| *b == 0));

    let encoded = id.encode();
    assert!(encoded.starts_with("0x"));
    assert_eq!(encoded.len(), 2 + CALL_ID_SIZE * 2);
}

#[test]
fn test_decode_rejects_invalid_input() {
    assert!(matches!(
        CallIdentifier::decode("0xnothex"),
        Err(CallIdError::InvalidHex(_))
    ));
    assert_eq!(
        CallIdentifier::decode("0x00"),
        Err(CallIdError::InvalidLength {
            expected: CALL_ID_SIZE,
            actual: 1
        })
    );

    let mut bytes = CallIdentifier::new(1, CallKind::Operation, random_hash()).to_bytes();
    bytes[0] = 7;
    assert_eq!(
        CallIdentifier::from_bytes(&bytes),
        Err(CallIdError::UnknownKind(7))
    );

    let mut bytes = CallIdentifier::new(1, CallKind::Operation, random_hash()).to_bytes();
    bytes[CALL_ID_SIZE - 1] = 1;
    assert_eq!(
        CallIdentifier::from_bytes(&bytes),
        Err(CallIdError::NonZeroPadding)
    );
}

#[test]
fn test_display_and_from_str() {
    let id = CallIdentifier::new(10, CallKind::Operation, random_hash());
    let parsed: CallIdentifier = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
}
