use bumpalo::Bump;
use serde_json::json;
use tracing::instrument;

use crate::{
  config::ScreeningConfig,
  matching::{comparers, name},
  model::{Entity, ScoreBreakdown, SearchQuery},
  trace::{ScoringContext, TracePhase, trace_data},
};

/// Factor scores considered an exact critical-identifier match.
const CRITICAL_MATCH: f64 = 0.99;

/// Floor of the final score once a critical identifier matched exactly; the
/// name can only add nuance on top.
const CRITICAL_BASE: f64 = 0.7;
const CRITICAL_NAME_SHARE: f64 = 0.3;

/// Score a full query subject against one candidate, producing the
/// per-factor breakdown and the index of the winning candidate alias, when
/// the alternate-name factor beat the primary one.
#[instrument(level = "trace", name = "score_entity", skip_all, fields(entity_id = candidate.id))]
pub(crate) fn score_query(bump: &Bump, cfg: &ScreeningConfig, ctx: &mut ScoringContext, query: &SearchQuery, candidate: &Entity) -> (ScoreBreakdown, Option<usize>) {
  // An authoritative source identifier settles the question outright.
  if let (Some(query_source_id), Some(candidate_source_id)) = (&query.source_id, &candidate.source_id)
    && !query_source_id.is_empty()
    && query_source_id == candidate_source_id
  {
    ctx.record(TracePhase::Aggregation, "source ids matched", || {
      trace_data([("entity_id", json!(candidate.id)), ("source_id", json!(query_source_id))])
    });

    return (ScoreBreakdown::perfect(), None);
  }

  let scoring = &cfg.scoring;
  let query_fields = query.prepared();
  let candidate_fields = candidate.prepared();

  ctx.record(TracePhase::Tokenization, "tokenized names", || {
    trace_data([
      ("entity_id", json!(candidate.id)),
      ("query_tokens", json!(query_fields.name.as_ref().map(|name| name.tokens.len()).unwrap_or(0))),
      ("candidate_aliases", json!(candidate_fields.alt_names.len())),
    ])
  });

  let mut breakdown = ScoreBreakdown::default();
  let mut matched_alias = None;

  if scoring.enable_name {
    breakdown.name = name::primary_score(bump, &cfg.similarity, query_fields, candidate_fields);

    ctx.record(TracePhase::NameComparison, "compared primary names", || {
      trace_data([("entity_id", json!(candidate.id)), ("score", json!(breakdown.name))])
    });
  }

  if scoring.enable_alt_names {
    let (score, alias) = name::alt_score(bump, &cfg.similarity, query_fields, candidate_fields);

    breakdown.alt_name = score;
    matched_alias = alias;

    ctx.record(TracePhase::AltNameComparison, "compared alternate names", || {
      trace_data([
        ("entity_id", json!(candidate.id)),
        ("score", json!(breakdown.alt_name)),
        ("alias", json!(alias.and_then(|index| candidate_fields.alt_names.get(index).map(|alternate| &alternate.source)))),
      ])
    });
  }

  if scoring.enable_addresses && !query_fields.addresses.is_empty() && !candidate_fields.addresses.is_empty() {
    breakdown.address = comparers::address::compare(bump, &cfg.similarity, &query_fields.addresses, &candidate_fields.addresses);

    ctx.record(TracePhase::AddressComparison, "compared addresses", || {
      trace_data([("entity_id", json!(candidate.id)), ("score", json!(breakdown.address))])
    });
  }

  if scoring.enable_government_ids && !query_fields.government_ids.is_empty() && !candidate_fields.government_ids.is_empty() {
    breakdown.gov_id = comparers::identifier::compare(&query_fields.government_ids, &candidate_fields.government_ids);

    ctx.record(TracePhase::GovIdComparison, "compared government ids", || {
      trace_data([("entity_id", json!(candidate.id)), ("score", json!(breakdown.gov_id))])
    });
  }

  if scoring.enable_crypto_addresses && !query.crypto_addresses.is_empty() && !candidate.crypto_addresses.is_empty() {
    breakdown.crypto = comparers::crypto::compare(&query.crypto_addresses, &candidate.crypto_addresses);

    ctx.record(TracePhase::CryptoComparison, "compared crypto addresses", || {
      trace_data([("entity_id", json!(candidate.id)), ("score", json!(breakdown.crypto))])
    });
  }

  if scoring.enable_contact {
    breakdown.contact = comparers::contact::compare(query_fields, candidate_fields);

    ctx.record(TracePhase::ContactComparison, "compared contact info", || {
      trace_data([("entity_id", json!(candidate.id)), ("score", json!(breakdown.contact))])
    });
  }

  let date_comparison = match scoring.enable_dates {
    true => comparers::dates::compare_life_dates(candidate.kind, &query.dates, &candidate.dates),
    false => None,
  };

  if let Some(score) = date_comparison {
    breakdown.date = score;

    ctx.record(TracePhase::DateComparison, "compared dates", || {
      trace_data([
        ("entity_id", json!(candidate.id)),
        ("score", json!(breakdown.date)),
        ("matched", json!(comparers::dates::is_match(breakdown.date))),
      ])
    });
  }

  let best_name = breakdown.name.max(breakdown.alt_name);
  let critical = breakdown.gov_id >= CRITICAL_MATCH || breakdown.crypto >= CRITICAL_MATCH || breakdown.contact >= CRITICAL_MATCH;

  breakdown.score = match critical {
    true => CRITICAL_BASE + CRITICAL_NAME_SHARE * best_name,
    false => weighted_sum(cfg, query, candidate, &breakdown, best_name),
  }
  .clamp(0.0, 1.0);

  tracing::debug!(entity_id = candidate.id, score = breakdown.score, critical = critical, "computed entity score");

  ctx.record(TracePhase::Aggregation, "aggregated factors", || {
    trace_data([
      ("entity_id", json!(candidate.id)),
      ("critical", json!(critical)),
      ("best_name", json!(best_name)),
      ("score", json!(breakdown.score)),
    ])
  });

  let matched_alias = (breakdown.alt_name > breakdown.name).then_some(matched_alias).flatten();

  (breakdown, matched_alias)
}

fn weighted_sum(cfg: &ScreeningConfig, query: &SearchQuery, candidate: &Entity, breakdown: &ScoreBreakdown, best_name: f64) -> f64 {
  let scoring = &cfg.scoring;

  let mut numerator = 0.0;
  let mut denominator = 0.0;

  if scoring.enable_name || scoring.enable_alt_names {
    numerator += best_name * scoring.name_weight;
    denominator += scoring.name_weight;
  }

  // Diverging source identifiers weigh against the match without zeroing it.
  if let (Some(query_source_id), Some(candidate_source_id)) = (&query.source_id, &candidate.source_id)
    && !query_source_id.is_empty()
    && !candidate_source_id.is_empty()
    && query_source_id != candidate_source_id
  {
    denominator += scoring.critical_id_weight;
  }

  let factors = [
    (breakdown.gov_id, scoring.critical_id_weight),
    (breakdown.crypto, scoring.critical_id_weight),
    (breakdown.contact, scoring.critical_id_weight),
    (breakdown.address, scoring.address_weight),
    (breakdown.date, scoring.supporting_info_weight),
  ];

  for (score, weight) in factors {
    if score > 0.0 {
      numerator += score * weight;
      denominator += weight;
    }
  }

  match denominator > 0.0 {
    true => numerator / denominator,
    false => 0.0,
  }
}

/// Name-only scoring path: the final score is the best name factor.
pub(crate) fn score_name(bump: &Bump, cfg: &ScreeningConfig, ctx: &mut ScoringContext, text: &str, candidate: &Entity) -> f64 {
  let query = SearchQuery::named(text);
  let (breakdown, _) = score_query(bump, cfg, ctx, &query, candidate);

  breakdown.score
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;
  use float_cmp::assert_approx_eq;

  use crate::{
    config::{ScoringOverride, ScreeningConfig},
    model::{ContactInfo, Entity, EntityDate, EntityKind, GovernmentId, GovernmentIdKind, LifeDates, SearchQuery},
    trace::ScoringContext,
  };

  fn maduro() -> Entity {
    Entity::builder(EntityKind::Person)
      .id("ofac-22790")
      .name("Nicolas Maduro Moros")
      .government_ids(vec![GovernmentId::builder().identifier("A1234567").kind(GovernmentIdKind::Passport).country("VE").build()])
      .build()
  }

  fn score(query: &SearchQuery, candidate: &Entity) -> crate::model::ScoreBreakdown {
    let (breakdown, _) = super::score_query(&Bump::new(), &ScreeningConfig::default(), &mut ScoringContext::disabled(), query, candidate);

    breakdown
  }

  #[test]
  fn matching_critical_id_dominates() {
    let query = SearchQuery::builder()
      .name("Nicolas Maduro Moros")
      .government_ids(vec![GovernmentId::builder().identifier("A-123.4567").kind(GovernmentIdKind::Passport).country("VE").build()])
      .build();

    let breakdown = score(&query, &maduro());

    assert_eq!(breakdown.gov_id, 1.0);
    assert_eq!(breakdown.score, 1.0);
  }

  #[test]
  fn country_downgrade_keeps_weighted_path() {
    let query = SearchQuery::builder()
      .name("Nicolas Maduro Moros")
      .government_ids(vec![GovernmentId::builder().identifier("A1234567").kind(GovernmentIdKind::Passport).country("CU").build()])
      .build();

    let breakdown = score(&query, &maduro());

    assert_eq!(breakdown.gov_id, 0.9);
    assert_approx_eq!(f64, breakdown.score, (35.0 + 0.9 * 50.0) / 85.0, epsilon = 1e-9);
    assert!(breakdown.score > 0.85 && breakdown.score <= 0.95);
  }

  #[test]
  fn critical_match_with_weak_name_stays_at_the_floor() {
    let query = SearchQuery::builder()
      .government_ids(vec![GovernmentId::builder().identifier("A1234567").build()])
      .build();

    let breakdown = score(&query, &maduro());

    assert_eq!(breakdown.gov_id, 1.0);
    assert_approx_eq!(f64, breakdown.score, 0.7, epsilon = 1e-9);
  }

  #[test]
  fn source_id_equality_short_circuits() {
    let query = SearchQuery::builder().name("completely different name").source_id("SDN-998").build();
    let candidate = Entity::builder(EntityKind::Person).id("x").source_id("SDN-998").name("Nicolas Maduro Moros").build();

    let breakdown = score(&query, &candidate);

    assert_eq!(breakdown.score, 1.0);
    assert_eq!(breakdown.name, 1.0);
    assert_eq!(breakdown.gov_id, 1.0);
  }

  #[test]
  fn source_id_mismatch_penalizes_the_denominator() {
    let query = SearchQuery::builder().name("Nicolas Maduro Moros").source_id("SDN-1").build();
    let candidate = Entity::builder(EntityKind::Person).id("x").source_id("SDN-2").name("Nicolas Maduro Moros").build();

    let breakdown = score(&query, &candidate);

    assert_approx_eq!(f64, breakdown.score, 35.0 / 85.0, epsilon = 1e-9);
  }

  #[test]
  fn alias_match_reports_the_alias() {
    let query = SearchQuery::named("AL-MALIZI");
    let candidate = Entity::builder(EntityKind::Business).id("x").name("Abu Sayyaf Group").alt_names(&["AL-MALIZI"]).build();

    let (breakdown, alias) = super::score_query(&Bump::new(), &ScreeningConfig::default(), &mut ScoringContext::disabled(), &query, &candidate);

    assert_eq!(breakdown.alt_name, 1.0);
    assert_eq!(breakdown.score, 1.0);
    assert_eq!(alias, Some(0));
  }

  #[test]
  fn disabling_a_factor_only_changes_the_denominator() {
    let query = SearchQuery::builder()
      .name("Nicolas Maduro Moros")
      .dates(LifeDates {
        birth: Some(EntityDate::new(1963, 11, 23)),
        ..Default::default()
      })
      .build();

    let mut candidate = maduro();
    candidate.government_ids.clear();
    candidate.dates.birth = Some(EntityDate::new(1962, 11, 23));
    candidate.prepare();

    let defaults = ScreeningConfig::default();

    let with_dates = {
      let (breakdown, _) = super::score_query(&Bump::new(), &defaults, &mut ScoringContext::disabled(), &query, &candidate);
      breakdown
    };

    let without_dates = {
      let config = defaults
        .resolve(Some(&crate::config::ConfigOverride {
          scoring: ScoringOverride {
            enable_dates: Some(false),
            ..Default::default()
          },
          ..Default::default()
        }))
        .unwrap();

      let (breakdown, _) = super::score_query(&Bump::new(), &config, &mut ScoringContext::disabled(), &query, &candidate);
      breakdown
    };

    let date_score = 0.4 * 0.9 + 0.3 + 0.3;

    assert_eq!(with_dates.name, without_dates.name);
    assert_eq!(without_dates.date, 0.0);
    assert_approx_eq!(f64, with_dates.date, date_score, epsilon = 1e-9);
    assert_approx_eq!(f64, with_dates.score, (35.0 + date_score * 15.0) / 50.0, epsilon = 1e-9);
    assert_approx_eq!(f64, without_dates.score, 1.0, epsilon = 1e-9);
  }

  #[test]
  fn breakdown_stays_within_bounds() {
    let query = SearchQuery::builder()
      .name("Maduro Nicolas")
      .government_ids(vec![GovernmentId::builder().identifier("A1234567").build()])
      .contact(ContactInfo::builder().email("a@b.c").build())
      .build();

    let breakdown = score(&query, &maduro());

    for component in [
      breakdown.name,
      breakdown.alt_name,
      breakdown.address,
      breakdown.gov_id,
      breakdown.crypto,
      breakdown.contact,
      breakdown.date,
      breakdown.score,
    ] {
      assert!((0.0..=1.0).contains(&component), "{component}");
    }
  }

  #[test]
  fn name_only_entry_point_uses_best_name() {
    let candidate = Entity::builder(EntityKind::Business).id("x").name("Abu Sayyaf Group").alt_names(&["AL-MALIZI"]).build();

    let score = super::score_name(&Bump::new(), &ScreeningConfig::default(), &mut ScoringContext::disabled(), "AL-MALIZI", &candidate);

    assert_eq!(score, 1.0);
  }

  #[test]
  fn name_score_is_invariant_under_normalization() {
    let candidate = Entity::builder(EntityKind::Person).id("x").name("José García").build();

    let raw = super::score_name(&Bump::new(), &ScreeningConfig::default(), &mut ScoringContext::disabled(), "JOSE GARCÍA", &candidate);
    let normalized = super::score_name(&Bump::new(), &ScreeningConfig::default(), &mut ScoringContext::disabled(), "jose garcia", &candidate);

    assert_approx_eq!(f64, raw, normalized, epsilon = 1e-12);
    assert_eq!(raw, 1.0);
  }
}
