use alloy_primitives::{Address, B256, U256};
use sha3::{Digest, Keccak256};

/// 8-byte PoW nonce.
pub type BlockNonce = [u8; 8];

/// Block header. Identity is the keccak hash of the encoded fields,
/// ordering is the block number. Decoding from the wire format happens
/// in the peer layer; this is the already-decoded form the sync engine
/// and validators work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub parent_hash: B256,
    pub uncle_hash: B256,
    pub coinbase: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: B256,
    pub nonce: BlockNonce,
    pub base_fee: Option<U256>,
}

impl BlockHeader {
    /// Compute the hash of this header (keccak256 of the field encoding).
    pub fn hash(&self) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.parent_hash);
        hasher.update(self.uncle_hash);
        hasher.update(self.coinbase);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.receipts_root);
        hasher.update(self.difficulty.to_be_bytes::<32>());
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update((self.extra_data.len() as u64).to_be_bytes());
        hasher.update(&self.extra_data);
        hasher.update(self.mix_hash);
        hasher.update(self.nonce);
        if let Some(base_fee) = self.base_fee {
            hasher.update(base_fee.to_be_bytes::<32>());
        }
        B256::from_slice(&hasher.finalize())
    }
}

/// Post-Shanghai withdrawal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    pub amount: u64,
}

/// Block body: raw transactions plus uncle headers, and withdrawals on
/// chains that have them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockBody {
    pub transactions: Vec<Vec<u8>>,
    pub uncles: Vec<BlockHeader>,
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// A full block, assembled by pairing a fetched body with its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Self {
        Self { header, body }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader {
            parent_hash: B256::ZERO,
            uncle_hash: B256::ZERO,
            coinbase: Address::ZERO,
            state_root: B256::ZERO,
            transactions_root: B256::ZERO,
            receipts_root: B256::ZERO,
            difficulty: U256::from(1000),
            number: 7,
            gas_limit: 8_000_000,
            gas_used: 21_000,
            timestamp: 1_700_000_000,
            extra_data: vec![1, 2, 3],
            mix_hash: B256::ZERO,
            nonce: [0u8; 8],
            base_fee: None,
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(header().hash(), header().hash());
    }

    #[test]
    fn hash_changes_with_fields() {
        let a = header();
        let mut b = header();
        b.number = 8;
        assert_ne!(a.hash(), b.hash());

        let mut c = header();
        c.base_fee = Some(U256::from(7));
        assert_ne!(a.hash(), c.hash());
    }
}
