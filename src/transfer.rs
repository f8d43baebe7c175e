//! Unsigned native-asset transfer transactions.
//!
//! The payload is a legacy-format transaction with one zeroed signature slot
//! for the fee payer. The customer's wallet fills the slot client-side and
//! submits it; the server never holds the customer's key.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::wallet::WalletAddress;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

const SYSTEM_PROGRAM_ID: [u8; 32] = [0; 32];
const SYSTEM_TRANSFER: u32 = 2;
const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("payer and recipient must be different accounts")]
    SameAccount,
    #[error("recent blockhash is not a 32-byte base58 value")]
    InvalidBlockhash,
    #[error("amount {0} cannot be expressed in lamports")]
    InvalidAmount(Decimal),
}

/// Converts an amount of the native asset into its smallest unit.
pub fn sol_to_lamports(amount: Decimal) -> Result<u64, TransferError> {
    if amount.is_sign_negative() {
        return Err(TransferError::InvalidAmount(amount));
    }
    amount
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .map(|lamports| lamports.round())
        .and_then(|lamports| lamports.to_u64())
        .ok_or(TransferError::InvalidAmount(amount))
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

#[derive(Debug, Clone)]
pub struct UnsignedTransfer {
    from: [u8; 32],
    to: [u8; 32],
    lamports: u64,
    recent_blockhash: [u8; 32],
}

impl UnsignedTransfer {
    pub fn new(
        from: &WalletAddress,
        to: &WalletAddress,
        lamports: u64,
        recent_blockhash: &str,
    ) -> Result<Self, TransferError> {
        if from == to {
            return Err(TransferError::SameAccount);
        }
        let recent_blockhash: WalletAddress = recent_blockhash
            .parse()
            .map_err(|_| TransferError::InvalidBlockhash)?;

        Ok(Self {
            from: from.to_bytes(),
            to: to.to_bytes(),
            lamports,
            recent_blockhash: recent_blockhash.to_bytes(),
        })
    }

    pub fn lamports(&self) -> u64 {
        self.lamports
    }

    /// The message the fee payer signs.
    pub fn message_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(150);

        // one signer (the payer), no read-only signers, the program is read-only
        buf.extend_from_slice(&[1, 0, 1]);

        encode_compact_u16(&mut buf, 3);
        buf.extend_from_slice(&self.from);
        buf.extend_from_slice(&self.to);
        buf.extend_from_slice(&SYSTEM_PROGRAM_ID);

        buf.extend_from_slice(&self.recent_blockhash);

        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
        data.extend_from_slice(&self.lamports.to_le_bytes());

        encode_compact_u16(&mut buf, 1);
        buf.push(2);
        encode_compact_u16(&mut buf, 2);
        buf.extend_from_slice(&[0, 1]);
        encode_compact_u16(&mut buf, data.len() as u16);
        buf.extend_from_slice(&data);

        buf
    }

    /// Wire bytes with an empty signature slot.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message_bytes();
        let mut buf = Vec::with_capacity(1 + SIGNATURE_LEN + message.len());
        encode_compact_u16(&mut buf, 1);
        buf.extend_from_slice(&[0u8; SIGNATURE_LEN]);
        buf.extend_from_slice(&message);
        buf
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.serialize())
    }
}

fn encode_compact_u16(buf: &mut Vec<u8>, mut value: u16) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn wallet(seed: u8) -> WalletAddress {
        WalletAddress::from_bytes([seed; 32])
    }

    fn blockhash() -> String {
        WalletAddress::from_bytes([42; 32]).to_string()
    }

    #[test]
    fn converts_decimal_amounts_to_lamports() {
        assert_eq!(
            sol_to_lamports(Decimal::from_str("15.97").unwrap()),
            Ok(15_970_000_000)
        );
        assert_eq!(sol_to_lamports(Decimal::ZERO), Ok(0));
        assert!(sol_to_lamports(Decimal::from_str("-1").unwrap()).is_err());
        assert_eq!(
            lamports_to_sol(2_500_000_000),
            Decimal::from_str("2.5").unwrap()
        );
    }

    #[test]
    fn compact_u16_uses_seven_bit_groups() {
        let mut buf = Vec::new();
        encode_compact_u16(&mut buf, 0x7f);
        encode_compact_u16(&mut buf, 0x80);
        encode_compact_u16(&mut buf, 0x3fff);
        assert_eq!(buf, vec![0x7f, 0x80, 0x01, 0xff, 0x7f]);
    }

    #[test]
    fn lays_out_a_single_transfer_instruction() {
        let transfer = UnsignedTransfer::new(&wallet(1), &wallet(2), 5_000, &blockhash()).unwrap();
        let message = transfer.message_bytes();

        assert_eq!(message.len(), 150);
        assert_eq!(&message[..4], &[1, 0, 1, 3]);
        assert_eq!(&message[4..36], &[1; 32]);
        assert_eq!(&message[36..68], &[2; 32]);
        assert_eq!(&message[68..100], &[0; 32]);
        assert_eq!(&message[100..132], &[42; 32]);
        // instruction count, program index, account indices, data length
        assert_eq!(&message[132..138], &[1, 2, 2, 0, 1, 12]);
        assert_eq!(&message[138..142], &2u32.to_le_bytes());
        assert_eq!(&message[142..150], &5_000u64.to_le_bytes());
    }

    #[test]
    fn serialized_payload_leaves_signature_slot_empty() {
        let transfer = UnsignedTransfer::new(&wallet(1), &wallet(2), 1, &blockhash()).unwrap();
        let bytes = transfer.serialize();

        assert_eq!(bytes.len(), 1 + 64 + 150);
        assert_eq!(bytes[0], 1);
        assert!(bytes[1..65].iter().all(|b| *b == 0));

        let decoded = STANDARD.decode(transfer.to_base64()).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn rejects_self_transfer_and_bad_blockhash() {
        assert_eq!(
            UnsignedTransfer::new(&wallet(1), &wallet(1), 1, &blockhash()).unwrap_err(),
            TransferError::SameAccount
        );
        assert_eq!(
            UnsignedTransfer::new(&wallet(1), &wallet(2), 1, "zz").unwrap_err(),
            TransferError::InvalidBlockhash
        );
    }
}
