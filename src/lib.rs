mod config;
mod error;
mod index;
mod matching;
mod model;
mod scoring;
mod search;
mod trace;

pub(crate) fn init() {
  let _ = *crate::matching::normalize::STOPWORDS;
  let _ = *crate::matching::normalize::COUNTRY_LABELS;
}

pub mod prelude {
  pub use crate::config::{
    ConfigOverride, ScoringConfig, ScoringOverride, ScreeningConfig, SearchParams, SearchParamsOverride, SimilarityConfig, SimilarityOverride,
  };
  pub use crate::error::VigiaError;
  pub use crate::index::EntityIndex;
  pub use crate::model::{
    Address, ContactInfo, CryptoAddress, Entity, EntityDate, EntityKind, GovernmentId, GovernmentIdKind, LifeDates, PreparedAddress, ScoreBreakdown,
    SearchQuery, SourceList,
  };
  pub use crate::search::{CancelToken, SearchHit, SearchOptions, SearchResults, Vigia};
  pub use crate::trace::{ScoringContext, ScoringEvent, ScoringTrace, TracePhase};
}

pub use crate::matching::normalize::{lower_and_strip_punctuation, normalize_country, normalize_identifier, normalize_phone, normalize_text};
