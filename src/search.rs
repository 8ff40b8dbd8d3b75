use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Instant,
};

use bumpalo::Bump;
use metrics::histogram;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::{
  config::{ConfigOverride, ScreeningConfig},
  error::VigiaError,
  index::EntityIndex,
  matching::{name, phonetic},
  model::{Entity, EntityKind, ScoreBreakdown, SearchQuery},
  scoring,
  trace::{ScoringContext, ScoringTrace, TracePhase, trace_data},
};

/// Cooperative cancellation flag, checked between candidates.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> CancelToken {
    CancelToken::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

/// Per-request search settings.
#[derive(Debug, Default, bon::Builder)]
pub struct SearchOptions {
  /// Configuration override, overlaid on the defaults field by field.
  pub overrides: Option<ConfigOverride>,
  /// Cancellation signal; a cancelled search returns the partial top-K.
  pub cancellation: Option<CancelToken>,
  /// Enables tracing under the given session id.
  #[builder(into)]
  pub trace_session: Option<String>,
}

/// One scored candidate.
#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
  pub entity: Arc<Entity>,
  pub score: f64,
  pub breakdown: ScoreBreakdown,
  /// The candidate alternate name that carried the match, when the
  /// alternate-name factor beat the primary name.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub matched_alias: Option<String>,
}

#[derive(Debug)]
pub struct SearchResults {
  pub hits: Vec<SearchHit>,
  pub trace: Option<ScoringTrace>,
}

/// The screening engine: an entity index plus default configuration.
#[derive(Debug)]
pub struct Vigia {
  index: EntityIndex,
  defaults: ScreeningConfig,
}

impl Vigia {
  /// Build an engine around validated defaults. Warms the embedded
  /// dictionaries so the first query does not pay for them.
  pub fn new(defaults: ScreeningConfig) -> Result<Vigia, VigiaError> {
    crate::init();

    Ok(Vigia {
      index: EntityIndex::new(),
      defaults: defaults.validated()?,
    })
  }

  pub fn index(&self) -> &EntityIndex {
    &self.index
  }

  /// Bulk-load entities into the index.
  pub fn load(&self, entities: Vec<Entity>) {
    self.index.upsert_all(entities);
  }

  /// Execute a query: resolve the configuration, walk an index snapshot
  /// through the phonetic and name gates, score survivors, and keep the
  /// ordered top matches.
  #[instrument(name = "search", skip_all, fields(candidates = self.index.len()))]
  pub fn search(&self, query: &SearchQuery, options: &SearchOptions) -> Result<SearchResults, VigiaError> {
    let config = self.defaults.resolve(options.overrides.as_ref())?;

    let mut ctx = match &options.trace_session {
      Some(session) => ScoringContext::enabled(session.clone()),
      None => ScoringContext::disabled(),
    };

    if query.is_unscoreable() {
      return Ok(SearchResults { hits: Vec::new(), trace: ctx.finish() });
    }

    let started = Instant::now();
    let snapshot = self.index.acquire();
    let cancellation = options.cancellation.clone().unwrap_or_default();

    ctx.record(TracePhase::Normalization, "prepared query", || {
      trace_data([
        ("name", json!(query.prepared().name.as_ref().map(|name| name.full.clone()))),
        ("candidates", json!(snapshot.entities().len())),
      ])
    });

    let parent = &ctx;

    let scored = snapshot
      .entities()
      .par_iter()
      .map_init(
        || Bump::with_capacity(1024),
        |bump, entity| {
          if cancellation.is_cancelled() {
            return (None, ScoringContext::disabled());
          }

          let mut child = parent.child();
          let hit = score_candidate(bump, &config, &mut child, query, entity);

          bump.reset();

          (hit, child)
        },
      )
      .collect::<Vec<_>>();

    let mut hits = Vec::with_capacity(scored.len().min(config.search.limit));

    for (hit, child) in scored {
      ctx.absorb(child);

      if let Some(hit) = hit {
        histogram!("vigia_scoring_scores").record(hit.score);
        hits.push(hit);
      }
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.entity.id.cmp(&b.entity.id)));
    hits.truncate(config.search.limit);

    histogram!("vigia_scoring_latency_seconds").record(started.elapsed().as_secs_f64());

    if let Some(best) = hits.first() {
      ctx.attach_breakdown(best.breakdown);
    }

    ctx.record(TracePhase::Aggregation, "search completed", || {
      trace_data([("hits", json!(hits.len())), ("cancelled", json!(cancellation.is_cancelled()))])
    });

    tracing::debug!(hits = hits.len(), latency = ?started.elapsed(), "search completed");

    Ok(SearchResults { hits, trace: ctx.finish() })
  }

  /// Score one candidate against a full query subject, with the caller's
  /// scoring context receiving the trace events.
  pub fn score_entity(&self, query: &SearchQuery, candidate: &Entity, ctx: &mut ScoringContext) -> ScoreBreakdown {
    let (breakdown, _) = scoring::score_query(&Bump::new(), &self.defaults, ctx, query, candidate);

    breakdown
  }

  /// Score one candidate against a bare name.
  pub fn score_name(&self, text: &str, candidate: &Entity) -> f64 {
    scoring::score_name(&Bump::new(), &self.defaults, &mut ScoringContext::disabled(), text, candidate)
  }
}

fn score_candidate(bump: &Bump, config: &ScreeningConfig, ctx: &mut ScoringContext, query: &SearchQuery, entity: &Arc<Entity>) -> Option<SearchHit> {
  // A declared kind restricts candidates; Unknown on either side compares
  // against anything.
  if let Some(kind) = query.kind
    && kind != EntityKind::Unknown
    && entity.kind != EntityKind::Unknown
    && entity.kind != kind
  {
    return None;
  }

  if phonetic::should_filter(&config.similarity, query.prepared().phonetic_key(), entity.prepared()) {
    return None;
  }

  if !name::close_enough(bump, &config.similarity, query.prepared(), entity.prepared()) {
    return None;
  }

  let (breakdown, alias) = scoring::score_query(bump, config, ctx, query, entity);

  if breakdown.score < config.search.min_match {
    return None;
  }

  Some(SearchHit {
    entity: entity.clone(),
    score: breakdown.score,
    breakdown,
    matched_alias: alias.and_then(|index| entity.prepared().alt_names.get(index).map(|alternate| alternate.source.clone())),
  })
}
