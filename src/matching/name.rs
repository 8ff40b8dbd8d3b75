use bumpalo::Bump;

use crate::{
  config::SimilarityConfig,
  matching::similarity,
  model::{PreparedFields, PreparedName},
};

/// Blended name score below which a candidate is not worth fully scoring.
pub(crate) const EARLY_EXIT_THRESHOLD: f64 = 0.4;

pub(crate) struct NameScore {
  pub(crate) score: f64,
  pub(crate) fields_compared: u8,
}

/// Blend of the primary-name comparison and the best alternate-name
/// comparison; the mean of whichever of the two could be computed.
pub(crate) fn calculate(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedFields, candidate: &PreparedFields) -> NameScore {
  let primary = match (&query.name, &candidate.name) {
    (Some(query_name), Some(candidate_name)) => Some(similarity::tokenized_prepared(
      bump,
      cfg,
      &candidate_name.token_refs(),
      &query_name.token_refs(),
      false,
    )),
    _ => None,
  };

  let alt = best_alternate(bump, cfg, query, candidate, false).map(|(score, _)| score);

  let (score, fields_compared) = match (primary, alt) {
    (Some(primary), Some(alt)) => ((primary + alt) / 2.0, 2),
    (Some(primary), None) => (primary, 1),
    (None, Some(alt)) => (alt, 1),
    (None, None) => (0.0, 0),
  };

  NameScore { score, fields_compared }
}

/// Early-exit gate. Candidates without a comparable primary name always
/// proceed; the scorer decides on the remaining factors.
pub(crate) fn close_enough(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedFields, candidate: &PreparedFields) -> bool {
  if query.name.is_none() || candidate.name.is_none() {
    return true;
  }

  calculate(bump, cfg, query, candidate).score >= EARLY_EXIT_THRESHOLD
}

/// Primary-name factor for the entity scorer.
pub(crate) fn primary_score(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedFields, candidate: &PreparedFields) -> f64 {
  match (&query.name, &candidate.name) {
    (Some(query_name), Some(candidate_name)) => similarity::tokenized_prepared(
      bump,
      cfg,
      &candidate_name.token_refs(),
      &query_name.token_refs(),
      true,
    ),
    _ => 0.0,
  }
}

/// Alternate-name factor for the entity scorer: the best score of any query
/// name against any candidate alternate, with the winning alternate's index.
pub(crate) fn alt_score(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedFields, candidate: &PreparedFields) -> (f64, Option<usize>) {
  match best_alternate(bump, cfg, query, candidate, true) {
    Some((score, index)) => (score, Some(index)),
    None => (0.0, None),
  }
}

fn best_alternate(bump: &Bump, cfg: &SimilarityConfig, query: &PreparedFields, candidate: &PreparedFields, favoring: bool) -> Option<(f64, usize)> {
  if candidate.alt_names.is_empty() {
    return None;
  }

  let query_names = query.name.iter().chain(query.alt_names.iter()).collect::<Vec<&PreparedName>>();

  if query_names.is_empty() {
    return None;
  }

  let mut best: Option<(f64, usize)> = None;

  for (index, alternate) in candidate.alt_names.iter().enumerate() {
    let alternate_tokens = alternate.token_refs();

    for query_name in &query_names {
      let score = similarity::tokenized_prepared(bump, cfg, &alternate_tokens, &query_name.token_refs(), favoring);

      if best.map(|(top, _)| score > top).unwrap_or(true) {
        best = Some((score, index));
      }

      if score >= 1.0 {
        return best;
      }
    }
  }

  best
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;
  use float_cmp::assert_approx_eq;

  use crate::{
    config::SimilarityConfig,
    model::{Entity, EntityKind, SearchQuery},
  };

  #[test]
  fn alias_only_match_passes_the_gate() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = SearchQuery::named("AL-MALIZI");
    let entity = Entity::builder(EntityKind::Business).id("x").name("Abu Sayyaf Group").alt_names(&["AL-MALIZI"]).build();

    let blended = super::calculate(&bump, &cfg, query.prepared(), entity.prepared());

    assert_eq!(blended.fields_compared, 2);
    assert_approx_eq!(f64, blended.score, 0.5, epsilon = 0.05);
    assert!(super::close_enough(&bump, &cfg, query.prepared(), entity.prepared()));

    let (alt, index) = super::alt_score(&bump, &cfg, query.prepared(), entity.prepared());

    assert_eq!(alt, 1.0);
    assert_eq!(index, Some(0));
  }

  #[test]
  fn dissimilar_names_fail_the_gate() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = SearchQuery::named("easy verification inc");
    let entity = Entity::builder(EntityKind::Business).id("x").name("zincum llc").build();

    assert!(!super::close_enough(&bump, &cfg, query.prepared(), entity.prepared()));
  }

  #[test]
  fn missing_primary_name_always_proceeds() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = SearchQuery::builder().government_ids(vec![]).build();
    let entity = Entity::builder(EntityKind::Person).id("x").name("anyone").build();

    assert!(super::close_enough(&bump, &cfg, query.prepared(), entity.prepared()));
  }

  #[test]
  fn primary_score_is_order_invariant() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let entity = Entity::builder(EntityKind::Person).id("x").name("AL-JASIM, Muhammad Husayn").build();

    let straight = super::primary_score(&bump, &cfg, SearchQuery::named("AL-JASIM, Muhammad Husayn").prepared(), entity.prepared());
    let reordered = super::primary_score(&bump, &cfg, SearchQuery::named("Muhammad Husayn AL-JASIM").prepared(), entity.prepared());

    assert_approx_eq!(f64, straight, reordered, epsilon = 1e-9);
    assert_eq!(straight, 1.0);
  }

  #[test]
  fn fields_compared_reflects_available_names() {
    let bump = Bump::new();
    let cfg = SimilarityConfig::default();

    let query = SearchQuery::named("anything");
    let no_names = Entity::builder(EntityKind::Person).id("x").build();

    let blended = super::calculate(&bump, &cfg, query.prepared(), no_names.prepared());

    assert_eq!(blended.fields_compared, 0);
    assert_eq!(blended.score, 0.0);
  }
}
