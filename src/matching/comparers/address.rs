use bumpalo::Bump;
use itertools::Itertools;

use crate::{config::SimilarityConfig, matching::similarity, model::PreparedAddress};

/// A pair this close is taken as the list-level answer without trying the
/// remaining combinations.
pub(crate) const EARLY_EXIT: f64 = 0.92;

const LINE1_WEIGHT: f64 = 5.0;
const LINE2_WEIGHT: f64 = 2.0;
const CITY_WEIGHT: f64 = 4.0;
const STATE_WEIGHT: f64 = 2.0;
const POSTAL_CODE_WEIGHT: f64 = 3.0;
const COUNTRY_WEIGHT: f64 = 4.0;

/// Best weighted score over every query/candidate address pair.
pub(crate) fn compare(bump: &Bump, cfg: &SimilarityConfig, query: &[PreparedAddress], candidate: &[PreparedAddress]) -> f64 {
  let mut best = 0.0f64;

  for (query_address, candidate_address) in query.iter().cartesian_product(candidate.iter()) {
    let score = compare_pair(bump, cfg, query_address, candidate_address);

    if score >= EARLY_EXIT {
      return score;
    }

    best = best.max(score);
  }

  best
}

/// Weighted per-field combination; fields empty on either side are skipped,
/// and an address with no comparable field scores zero.
fn compare_pair(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedAddress, candidate: &PreparedAddress) -> f64 {
  let mut numerator = 0.0;
  let mut denominator = 0.0;

  let token_fields = [
    (LINE1_WEIGHT, &query.line1_tokens, &candidate.line1_tokens),
    (LINE2_WEIGHT, &query.line2_tokens, &candidate.line2_tokens),
    (CITY_WEIGHT, &query.city_tokens, &candidate.city_tokens),
  ];

  for (weight, query_tokens, candidate_tokens) in token_fields {
    if query_tokens.is_empty() || candidate_tokens.is_empty() {
      continue;
    }

    let query_tokens = query_tokens.iter().map(|token| token.as_str()).collect::<Vec<_>>();
    let candidate_tokens = candidate_tokens.iter().map(|token| token.as_str()).collect::<Vec<_>>();

    numerator += weight * similarity::best_pair(bump, cfg, &candidate_tokens, &query_tokens);
    denominator += weight;
  }

  let equality_fields = [
    (STATE_WEIGHT, &query.state, &candidate.state),
    (POSTAL_CODE_WEIGHT, &query.postal_code, &candidate.postal_code),
    (COUNTRY_WEIGHT, &query.country, &candidate.country),
  ];

  for (weight, query_value, candidate_value) in equality_fields {
    if query_value.is_empty() || candidate_value.is_empty() {
      continue;
    }

    if query_value.eq_ignore_ascii_case(candidate_value) {
      numerator += weight;
    }

    denominator += weight;
  }

  match denominator > 0.0 {
    true => numerator / denominator,
    false => 0.0,
  }
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;
  use float_cmp::assert_approx_eq;

  use crate::{
    config::SimilarityConfig,
    model::{Address, PreparedAddress},
  };

  fn prepared(address: Address) -> PreparedAddress {
    PreparedAddress::of(&address)
  }

  #[test]
  fn identical_addresses_score_one() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let address = prepared(Address::builder().line1("12 Main Street").city("Springfield").state("IL").postal_code("62704").country("US").build());

    assert_eq!(super::compare(&bump, &cfg, std::slice::from_ref(&address), &[address.clone()]), 1.0);
  }

  #[test]
  fn fields_missing_on_either_side_are_skipped() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = prepared(Address::builder().city("Springfield").country("US").build());
    let candidate = prepared(Address::builder().line1("12 Main Street").city("Springfield").country("USA").build());

    // Only city (4) and country (4) are compared, and both match.
    assert_eq!(super::compare(&bump, &cfg, &[query], &[candidate]), 1.0);
  }

  #[test]
  fn country_mismatch_weighs_in() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = prepared(Address::builder().city("Springfield").country("US").build());
    let candidate = prepared(Address::builder().city("Springfield").country("CA").build());

    assert_approx_eq!(f64, super::compare(&bump, &cfg, &[query], &[candidate]), 0.5, epsilon = 1e-9);
  }

  #[test]
  fn best_pair_over_address_lists() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = prepared(Address::builder().city("Caracas").country("VE").build());

    let candidates = [
      prepared(Address::builder().city("Havana").country("CU").build()),
      prepared(Address::builder().city("Caracas").country("VE").build()),
    ];

    assert_eq!(super::compare(&bump, &cfg, std::slice::from_ref(&query), &candidates), 1.0);
  }

  #[test]
  fn nothing_comparable_scores_zero() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = prepared(Address::builder().state("tx").build());
    let candidate = prepared(Address::builder().city("Austin").build());

    assert_eq!(super::compare(&bump, &cfg, &[query], &[candidate]), 0.0);
  }
}
