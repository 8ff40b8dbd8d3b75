use itertools::Itertools;

use crate::model::CryptoAddress;

/// Wallet addresses either match byte-for-byte or not at all; most chains
/// are case-sensitive, so no normalization applies.
pub(crate) fn compare(query: &[CryptoAddress], candidate: &[CryptoAddress]) -> f64 {
  for (query_wallet, candidate_wallet) in query.iter().cartesian_product(candidate.iter()) {
    if !query_wallet.address.is_empty() && query_wallet.address == candidate_wallet.address {
      return 1.0;
    }
  }

  0.0
}
