use alloy::{
    network::ReceiptResponse,
    primitives::{Address, TxHash},
};

/// What the network reported once a transaction was mined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// Mined transaction.
    pub tx_hash: TxHash,
    /// Created contract, for creation transactions.
    pub contract_address: Option<Address>,
    /// Including block.
    pub block_number: Option<u64>,
    /// Gas consumed.
    pub gas_used: u64,
    /// `false` if execution reverted.
    pub success: bool,
}

impl Confirmation {
    /// Collects the fields of interest from any receipt type.
    pub fn from_receipt<R: ReceiptResponse>(receipt: &R) -> Self {
        Self {
            tx_hash: receipt.transaction_hash(),
            contract_address: receipt.contract_address(),
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
            success: receipt.status(),
        }
    }
}
