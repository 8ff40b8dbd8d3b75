use compact_str::CompactString;
use rphonetic::{Encoder, Soundex};

use crate::{config::SimilarityConfig, model::PreparedFields};

/// Phonetic fingerprint of a prepared name, taken from the leading token of
/// its sorted token list so word order cannot change the verdict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PhoneticKey {
  pub(crate) first: char,
  pub(crate) code: CompactString,
}

impl PhoneticKey {
  pub(crate) fn of_tokens<'t>(tokens: impl Iterator<Item = &'t str>) -> Option<PhoneticKey> {
    let leading = tokens.filter(|token| !token.is_empty()).min()?;

    Some(PhoneticKey {
      first: leading.chars().next()?,
      code: CompactString::from(Soundex::default().encode(leading)),
    })
  }
}

/// Whether scoring this candidate can be skipped on phonetic grounds. The
/// candidate survives if any of its names is compatible with the query key.
pub(crate) fn should_filter(cfg: &SimilarityConfig, query: Option<&PhoneticKey>, candidate: &PreparedFields) -> bool {
  if cfg.disable_phonetic_filtering {
    return false;
  }

  let Some(query) = query else {
    return false;
  };

  let mut keys = candidate.name.iter().chain(candidate.alt_names.iter()).filter_map(|name| name.key.as_ref()).peekable();

  if keys.peek().is_none() {
    return false;
  }

  !keys.any(|key| compatible(query, key))
}

/// First characters equal, same initial equivalence class, or equal Soundex
/// codes.
pub(crate) fn compatible(lhs: &PhoneticKey, rhs: &PhoneticKey) -> bool {
  if lhs.first == rhs.first {
    return true;
  }

  if let (Some(lhs_class), Some(rhs_class)) = (initial_class(lhs.first), initial_class(rhs.first))
    && lhs_class == rhs_class
  {
    return true;
  }

  !lhs.code.is_empty() && lhs.code == rhs.code
}

// Initials that commonly substitute for one another across transliterations
// (Catherine/Katherine/Qatarina, soft G, the ph/f phoneme, s/x sibilants).
fn initial_class(c: char) -> Option<u8> {
  match c {
    'c' | 'k' | 'q' => Some(0),
    's' | 'x' => Some(1),
    'j' | 'g' => Some(2),
    'f' | 'p' => Some(3),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use crate::{config::SimilarityConfig, model::PreparedFields};

  use super::PhoneticKey;

  fn key(name: &str) -> PhoneticKey {
    PhoneticKey::of_tokens(name.split_whitespace()).unwrap()
  }

  #[test]
  fn soundex_codes() {
    assert_eq!(key("robert").code, "R163");
    assert_eq!(key("rupert").code, "R163");
    assert_eq!(key("tymczak").code, "T522");
  }

  #[test]
  fn compatible_initials_and_codes() {
    assert!(super::compatible(&key("catherine"), &key("katherine")));
    assert!(super::compatible(&key("catherine"), &key("qatarina")));
    assert!(super::compatible(&key("philip"), &key("filip")));
    assert!(super::compatible(&key("geoffrey"), &key("jeffrey")));
    assert!(super::compatible(&key("mohammad"), &key("muhammad")));
    assert!(super::compatible(&key("smith"), &key("smyth")));

    assert!(!super::compatible(&key("zincum"), &key("easy")));
    assert!(!super::compatible(&key("vladimir"), &key("dmitri")));
  }

  #[test]
  fn decision_depends_only_on_leading_tokens() {
    // Trailing tokens never factor in, as long as they sort after the
    // leading one.
    assert!(super::compatible(&key("catherine zimmer"), &key("katherine zane")));
    assert!(super::compatible(&key("catherine"), &key("katherine zane")));
    assert!(!super::compatible(&key("vladimir zhukov"), &key("dmitri zhukov")));
  }

  #[test]
  fn word_order_does_not_change_the_key() {
    assert_eq!(key("aljasim muhammad husayn"), key("muhammad husayn aljasim"));
  }

  #[test]
  fn disabled_filtering_never_skips() {
    let cfg = SimilarityConfig {
      disable_phonetic_filtering: true,
      ..Default::default()
    };

    let candidate = PreparedFields::default();

    assert!(!super::should_filter(&cfg, Some(&key("anything")), &candidate));
  }
}
