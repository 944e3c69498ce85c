//! Contract call encoding and return-data decoding.
//!
//! Entry points are invoked by name with positional arguments; the selector
//! is derived from the canonical signature so no ABI JSON is needed.

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("failed to decode {expected}: {reason}")]
    Decode { expected: &'static str, reason: String },

    #[error("return data has no slot {0}")]
    MissingSlot(usize),
}

/// A single encoded call against a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub to: Address,
    /// Function name, kept for logging and test assertions.
    pub function: String,
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(to: Address, name: &str, params: &[ParamType], args: &[Token]) -> Self {
        let mut data = abi::short_signature(name, params).to_vec();
        data.extend(abi::encode(args));
        Self {
            to,
            function: name.to_string(),
            data: data.into(),
        }
    }

    /// Call to a function that takes no arguments.
    pub fn getter(to: Address, name: &str) -> Self {
        Self::new(to, name, &[], &[])
    }

    /// `None` when `data` is shorter than a selector, which only a
    /// deserialized call can be.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4)?.try_into().ok()
    }

    /// ABI-encoded arguments without the selector. Empty when `data` is
    /// shorter than a selector.
    pub fn args(&self) -> &[u8] {
        self.data.get(4..).unwrap_or_default()
    }
}

/// ERC-20 `approve(spender, amount)`.
pub fn erc20_approve(token: Address, spender: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        token,
        "approve",
        &[ParamType::Address, ParamType::Uint(256)],
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

/// ERC-20 `balanceOf(owner)`.
pub fn erc20_balance_of(token: Address, owner: Address) -> ContractCall {
    ContractCall::new(
        token,
        "balanceOf",
        &[ParamType::Address],
        &[Token::Address(owner)],
    )
}

fn decode_one(
    kind: ParamType,
    expected: &'static str,
    data: &[u8],
) -> Result<Token, AbiError> {
    abi::decode(&[kind], data)
        .map_err(|e| AbiError::Decode {
            expected,
            reason: e.to_string(),
        })?
        .pop()
        .ok_or(AbiError::Decode {
            expected,
            reason: "empty return data".into(),
        })
}

fn mismatch(expected: &'static str) -> AbiError {
    AbiError::Decode {
        expected,
        reason: "unexpected token type".into(),
    }
}

pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    decode_one(ParamType::String, "string", data)?
        .into_string()
        .ok_or_else(|| mismatch("string"))
}

pub fn decode_u256(data: &[u8]) -> Result<U256, AbiError> {
    decode_one(ParamType::Uint(256), "uint256", data)?
        .into_uint()
        .ok_or_else(|| mismatch("uint256"))
}

pub fn decode_address(data: &[u8]) -> Result<Address, AbiError> {
    decode_one(ParamType::Address, "address", data)?
        .into_address()
        .ok_or_else(|| mismatch("address"))
}

pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    decode_one(ParamType::Bool, "bool", data)?
        .into_bool()
        .ok_or_else(|| mismatch("bool"))
}

pub fn decode_address_array(data: &[u8]) -> Result<Vec<Address>, AbiError> {
    decode_one(
        ParamType::Array(Box::new(ParamType::Address)),
        "address[]",
        data,
    )?
    .into_array()
    .ok_or_else(|| mismatch("address[]"))?
    .into_iter()
    .map(|t| t.into_address().ok_or_else(|| mismatch("address[]")))
    .collect()
}

pub fn decode_string_array(data: &[u8]) -> Result<Vec<String>, AbiError> {
    decode_one(
        ParamType::Array(Box::new(ParamType::String)),
        "string[]",
        data,
    )?
    .into_array()
    .ok_or_else(|| mismatch("string[]"))?
    .into_iter()
    .map(|t| t.into_string().ok_or_else(|| mismatch("string[]")))
    .collect()
}

/// Decode the `string[]` sitting in head slot `slot` of a multi-value return.
///
/// Only that slot's layout is assumed: its head word is the offset of the
/// array tail. The other return values are never interpreted, so the getter
/// may grow without breaking this reader.
pub fn decode_string_array_at(data: &[u8], slot: usize) -> Result<Vec<String>, AbiError> {
    let head = data
        .get(slot * 32..(slot + 1) * 32)
        .ok_or(AbiError::MissingSlot(slot))?;
    let offset = U256::from_big_endian(head);
    if offset > U256::from(data.len()) {
        return Err(AbiError::MissingSlot(slot));
    }
    let offset = offset.as_usize();

    // Re-frame the tail as a standalone single-value return.
    let mut framed = Vec::with_capacity(32 + data.len() - offset);
    framed.extend_from_slice(&abi::encode(&[Token::Uint(U256::from(32))]));
    framed.extend_from_slice(&data[offset..]);
    decode_string_array(&framed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn approve_uses_standard_selector() {
        let call = erc20_approve(addr(1), addr(2), U256::from(10));
        assert_eq!(call.selector(), Some([0x09, 0x5e, 0xa7, 0xb3]));
        assert_eq!(call.function, "approve");
        assert_eq!(call.args().len(), 64);
        assert_eq!(call.to, addr(1));
    }

    #[test]
    fn balance_of_uses_standard_selector() {
        let call = erc20_balance_of(addr(1), addr(2));
        assert_eq!(call.selector(), Some([0x70, 0xa0, 0x82, 0x31]));
    }

    #[test]
    fn getter_has_only_selector() {
        let call = ContractCall::getter(addr(3), "title");
        assert_eq!(call.data.len(), 4);
        assert!(call.args().is_empty());
    }

    #[test]
    fn short_deserialized_call_has_no_selector() {
        let call: ContractCall = serde_json::from_value(serde_json::json!({
            "to": format!("{:?}", addr(4)),
            "function": "truncated",
            "data": "0x0102",
        }))
        .unwrap();
        assert_eq!(call.selector(), None);
        assert!(call.args().is_empty());
    }

    #[test]
    fn decodes_scalar_returns() {
        let s = abi::encode(&[Token::String("Project Phoenix".into())]);
        assert_eq!(decode_string(&s).unwrap(), "Project Phoenix");

        let n = abi::encode(&[Token::Uint(U256::from(42u64))]);
        assert_eq!(decode_u256(&n).unwrap(), U256::from(42u64));

        let a = abi::encode(&[Token::Address(addr(9))]);
        assert_eq!(decode_address(&a).unwrap(), addr(9));

        let b = abi::encode(&[Token::Bool(true)]);
        assert!(decode_bool(&b).unwrap());
    }

    #[test]
    fn decode_rejects_short_data() {
        assert!(matches!(decode_u256(&[0u8; 3]), Err(AbiError::Decode { .. })));
        assert!(decode_string(&[]).is_err());
    }

    #[test]
    fn decodes_address_array() {
        let data = abi::encode(&[Token::Array(vec![
            Token::Address(addr(1)),
            Token::Address(addr(2)),
        ])]);
        assert_eq!(decode_address_array(&data).unwrap(), vec![addr(1), addr(2)]);
    }

    #[test]
    fn reads_string_array_from_fifth_slot() {
        let data = abi::encode(&[
            Token::Address(addr(7)),
            Token::String("Title".into()),
            Token::Uint(U256::from(1000u64)),
            Token::Uint(U256::from(10u64)),
            Token::Array(vec![
                Token::String("F-BTC".into()),
                Token::String("F-XRP".into()),
            ]),
            Token::Bool(true),
        ]);
        let tickers = decode_string_array_at(&data, 4).unwrap();
        assert_eq!(tickers, vec!["F-BTC", "F-XRP"]);
    }

    #[test]
    fn missing_slot_is_reported() {
        let data = abi::encode(&[Token::Bool(true)]);
        assert_eq!(decode_string_array_at(&data, 4), Err(AbiError::MissingSlot(4)));
    }
}
