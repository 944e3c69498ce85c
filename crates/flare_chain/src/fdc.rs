//! Proof-of-personhood verification through the FDC verifier contract.

use std::sync::Arc;

use ethers_core::abi::{ParamType, Token};
use ethers_core::types::Address;
use flare_core::Notice;
use tracing::info;

use crate::abi::{self, ContractCall};
use crate::ledger::{Ledger, LedgerError, TxReceipt, Wallet, send_and_confirm};

#[derive(Clone)]
pub struct FdcVerifier {
    ledger: Arc<dyn Ledger>,
    verifier: Address,
}

impl FdcVerifier {
    pub fn new(ledger: Arc<dyn Ledger>, verifier: Address) -> Self {
        Self { ledger, verifier }
    }

    pub fn check_call(&self, account: Address) -> ContractCall {
        ContractCall::new(
            self.verifier,
            "checkVerification",
            &[ParamType::Address],
            &[Token::Address(account)],
        )
    }

    /// Whether `account` has a recorded attestation.
    pub async fn is_verified(&self, account: Address) -> Result<bool, LedgerError> {
        let data = self.ledger.call(&self.check_call(account)).await?;
        abi::decode_bool(&data).map_err(|e| LedgerError::Malformed(e.to_string()))
    }

    /// Submit the attestation for the wallet's account and wait until mined.
    pub async fn verify_me(&self, wallet: &dyn Wallet) -> Result<TxReceipt, LedgerError> {
        let account = wallet.account().ok_or(LedgerError::NotConnected)?;
        let call = ContractCall::getter(self.verifier, "verifyMe");
        let receipt = send_and_confirm(self.ledger.as_ref(), wallet, &call).await?;
        info!(?account, tx = ?receipt.tx_hash, "identity attestation recorded");
        Ok(receipt)
    }
}

/// Notice shown once an attestation is mined.
pub fn verified_notice() -> Notice {
    Notice::success("Identity Verified!")
        .with_description("Your proof of personhood has been recorded on the Flare Network.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_call_targets_verifier() {
        struct Unused;
        #[async_trait::async_trait]
        impl Ledger for Unused {
            async fn call_batch(
                &self,
                _: &[ContractCall],
            ) -> Result<Vec<crate::ledger::CallOutcome>, LedgerError> {
                unreachable!()
            }
            async fn wait_for_receipt(
                &self,
                _: ethers_core::types::H256,
            ) -> Result<TxReceipt, LedgerError> {
                unreachable!()
            }
            async fn native_balance(
                &self,
                _: Address,
            ) -> Result<ethers_core::types::U256, LedgerError> {
                unreachable!()
            }
        }

        let fdc = FdcVerifier::new(Arc::new(Unused), Address::repeat_byte(5));
        let call = fdc.check_call(Address::repeat_byte(6));
        assert_eq!(call.to, Address::repeat_byte(5));
        assert_eq!(call.function, "checkVerification");
        assert_eq!(call.args().len(), 32);
    }

    #[test]
    fn notice_is_success() {
        let n = verified_notice();
        assert_eq!(n.variant, flare_core::NoticeVariant::Success);
        assert!(n.description.unwrap().contains("proof of personhood"));
    }
}
