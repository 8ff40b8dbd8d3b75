use itertools::Itertools;

use crate::model::PreparedGovernmentId;

/// Downgrade applied when the identifier matches but the issuing countries
/// disagree.
const COUNTRY_MISMATCH: f64 = 0.9;

/// Best score over every query/candidate identifier pair. Identifiers only
/// pair up on normalized equality; a declared kind mismatch vetoes the pair.
pub(crate) fn compare(query: &[PreparedGovernmentId], candidate: &[PreparedGovernmentId]) -> f64 {
  let mut best = 0.0f64;

  for (query_id, candidate_id) in query.iter().cartesian_product(candidate.iter()) {
    if query_id.identifier.is_empty() || query_id.identifier != candidate_id.identifier {
      continue;
    }

    if let (Some(query_kind), Some(candidate_kind)) = (query_id.kind, candidate_id.kind)
      && query_kind != candidate_kind
    {
      continue;
    }

    let score = match (&query_id.country, &candidate_id.country) {
      (Some(query_country), Some(candidate_country)) if !query_country.eq_ignore_ascii_case(candidate_country) => COUNTRY_MISMATCH,
      _ => 1.0,
    };

    if score >= 1.0 {
      return 1.0;
    }

    best = best.max(score);
  }

  best
}
