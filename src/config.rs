use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use validator::Validate;

use crate::error::VigiaError;

/// Knobs for the string-similarity engine.
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct SimilarityConfig {
  /// Minimum Jaro score before the common-prefix boost applies.
  #[serde_inline_default(0.7)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub jaro_winkler_boost_threshold: f64,
  /// Longest common prefix rewarded by the boost.
  #[serde_inline_default(4)]
  #[validate(range(max = 16, message = "must be within 0 and 16"))]
  pub jaro_winkler_prefix_size: usize,
  /// Tokens whose lengths diverge past this factor score zero outright.
  #[serde_inline_default(0.9)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub length_difference_cutoff_factor: f64,
  #[serde_inline_default(0.3)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub length_difference_penalty_weight: f64,
  #[serde_inline_default(0.9)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub different_letter_penalty_weight: f64,
  /// Additive reward for per-token perfect matches in final name scoring.
  #[serde_inline_default(0.0)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub exact_match_favoritism: f64,
  /// Penalty applied per indexed token left without a partner.
  #[serde_inline_default(0.15)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub unmatched_index_token_weight: f64,
  /// Token positions within this distance pair up first on score ties.
  #[serde_inline_default(3)]
  #[validate(range(max = 16, message = "must be within 0 and 16"))]
  pub adjacent_similarity_positions: usize,
  #[serde_inline_default(false)]
  pub disable_phonetic_filtering: bool,
  #[serde_inline_default(false)]
  pub keep_stopwords: bool,
}

impl Default for SimilarityConfig {
  fn default() -> SimilarityConfig {
    SimilarityConfig {
      jaro_winkler_boost_threshold: 0.7,
      jaro_winkler_prefix_size: 4,
      length_difference_cutoff_factor: 0.9,
      length_difference_penalty_weight: 0.3,
      different_letter_penalty_weight: 0.9,
      exact_match_favoritism: 0.0,
      unmatched_index_token_weight: 0.15,
      adjacent_similarity_positions: 3,
      disable_phonetic_filtering: false,
      keep_stopwords: false,
    }
  }
}

/// Factor weights and enablement for the entity scorer.
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct ScoringConfig {
  #[serde_inline_default(35.0)]
  #[validate(range(min = 0.0, max = 100.0, message = "must be within 0.0 and 100.0"))]
  pub name_weight: f64,
  #[serde_inline_default(25.0)]
  #[validate(range(min = 0.0, max = 100.0, message = "must be within 0.0 and 100.0"))]
  pub address_weight: f64,
  #[serde_inline_default(50.0)]
  #[validate(range(min = 0.0, max = 100.0, message = "must be within 0.0 and 100.0"))]
  pub critical_id_weight: f64,
  #[serde_inline_default(15.0)]
  #[validate(range(min = 0.0, max = 100.0, message = "must be within 0.0 and 100.0"))]
  pub supporting_info_weight: f64,

  #[serde_inline_default(true)]
  pub enable_name: bool,
  #[serde_inline_default(true)]
  pub enable_alt_names: bool,
  #[serde_inline_default(true)]
  pub enable_addresses: bool,
  #[serde_inline_default(true)]
  pub enable_government_ids: bool,
  #[serde_inline_default(true)]
  pub enable_crypto_addresses: bool,
  #[serde_inline_default(true)]
  pub enable_contact: bool,
  #[serde_inline_default(true)]
  pub enable_dates: bool,
}

impl Default for ScoringConfig {
  fn default() -> ScoringConfig {
    ScoringConfig {
      name_weight: 35.0,
      address_weight: 25.0,
      critical_id_weight: 50.0,
      supporting_info_weight: 15.0,
      enable_name: true,
      enable_alt_names: true,
      enable_addresses: true,
      enable_government_ids: true,
      enable_crypto_addresses: true,
      enable_contact: true,
      enable_dates: true,
    }
  }
}

/// Result selection settings.
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct SearchParams {
  /// Minimum final score for a candidate to be returned.
  #[serde_inline_default(0.88)]
  #[validate(range(min = 0.0, max = 1.0, message = "must be within 0.0 and 1.0"))]
  pub min_match: f64,
  /// Maximum number of hits to return.
  #[serde_inline_default(10)]
  #[validate(range(min = 1, max = 1000, message = "must be within 1 and 1000"))]
  pub limit: usize,
}

impl Default for SearchParams {
  fn default() -> SearchParams {
    SearchParams { min_match: 0.88, limit: 10 }
  }
}

/// The full configuration triple, used both for startup defaults and as the
/// resolved per-request value after overlaying a [`ConfigOverride`].
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ScreeningConfig {
  #[serde(default)]
  pub similarity: SimilarityConfig,
  #[serde(default)]
  pub scoring: ScoringConfig,
  #[serde(default)]
  pub search: SearchParams,
}

impl ScreeningConfig {
  pub(crate) fn validated(self) -> Result<ScreeningConfig, VigiaError> {
    self.similarity.validate().map_err(|errors| VigiaError::from_validation("similarity", &errors))?;
    self.scoring.validate().map_err(|errors| VigiaError::from_validation("scoring", &errors))?;
    self.search.validate().map_err(|errors| VigiaError::from_validation("search", &errors))?;

    Ok(self)
  }

  /// Overlay a per-request override, field by field; absent fields inherit
  /// the defaults. The merged result is validated before use.
  pub fn resolve(&self, overrides: Option<&ConfigOverride>) -> Result<ScreeningConfig, VigiaError> {
    let mut resolved = self.clone();

    if let Some(overrides) = overrides {
      overrides.similarity.apply(&mut resolved.similarity);
      overrides.scoring.apply(&mut resolved.scoring);
      overrides.search.apply(&mut resolved.search);
    }

    resolved.validated()
  }
}

macro_rules! overlay {
  ($from:expr, $onto:expr, [$($field:ident),+ $(,)?]) => {
    $(
      if let Some(value) = $from.$field {
        $onto.$field = value;
      }
    )+
  };
}

/// Per-request configuration override; every field is optional and absent
/// fields mean "inherit the default".
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConfigOverride {
  #[serde(default)]
  pub similarity: SimilarityOverride,
  #[serde(default)]
  pub scoring: ScoringOverride,
  #[serde(default)]
  pub search: SearchParamsOverride,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SimilarityOverride {
  pub jaro_winkler_boost_threshold: Option<f64>,
  pub jaro_winkler_prefix_size: Option<usize>,
  pub length_difference_cutoff_factor: Option<f64>,
  pub length_difference_penalty_weight: Option<f64>,
  pub different_letter_penalty_weight: Option<f64>,
  pub exact_match_favoritism: Option<f64>,
  pub unmatched_index_token_weight: Option<f64>,
  pub adjacent_similarity_positions: Option<usize>,
  pub disable_phonetic_filtering: Option<bool>,
  pub keep_stopwords: Option<bool>,
}

impl SimilarityOverride {
  fn apply(&self, onto: &mut SimilarityConfig) {
    overlay!(self, onto, [
      jaro_winkler_boost_threshold,
      jaro_winkler_prefix_size,
      length_difference_cutoff_factor,
      length_difference_penalty_weight,
      different_letter_penalty_weight,
      exact_match_favoritism,
      unmatched_index_token_weight,
      adjacent_similarity_positions,
      disable_phonetic_filtering,
      keep_stopwords,
    ]);
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ScoringOverride {
  pub name_weight: Option<f64>,
  pub address_weight: Option<f64>,
  pub critical_id_weight: Option<f64>,
  pub supporting_info_weight: Option<f64>,
  pub enable_name: Option<bool>,
  pub enable_alt_names: Option<bool>,
  pub enable_addresses: Option<bool>,
  pub enable_government_ids: Option<bool>,
  pub enable_crypto_addresses: Option<bool>,
  pub enable_contact: Option<bool>,
  pub enable_dates: Option<bool>,
}

impl ScoringOverride {
  fn apply(&self, onto: &mut ScoringConfig) {
    overlay!(self, onto, [
      name_weight,
      address_weight,
      critical_id_weight,
      supporting_info_weight,
      enable_name,
      enable_alt_names,
      enable_addresses,
      enable_government_ids,
      enable_crypto_addresses,
      enable_contact,
      enable_dates,
    ]);
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchParamsOverride {
  pub min_match: Option<f64>,
  pub limit: Option<usize>,
}

impl SearchParamsOverride {
  fn apply(&self, onto: &mut SearchParams) {
    overlay!(self, onto, [min_match, limit]);
  }
}
