use std::sync::LazyLock;

use ahash::{HashMap, HashSet};
use itertools::Itertools;
use rust_embed::Embed;
use serde::Deserialize;
use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::UnicodeNormalization;

#[derive(Embed)]
#[folder = "./assets"]
struct Dictionaries;

pub(crate) static STOPWORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
  let file = Dictionaries::get("stopwords.yml").expect("could not read stopwords dictionary");
  let dictionary = serde_yaml::from_slice::<StopwordDictionary>(&file.data).expect("could not unmarshal stopwords dictionary");

  dictionary.corporate.into_iter().chain(dictionary.locative).map(|word| word.to_lowercase()).collect()
});

#[derive(Deserialize)]
struct StopwordDictionary {
  #[serde(rename = "CORPORATE_STOPWORDS")]
  corporate: Vec<String>,
  #[serde(rename = "LOCATIVE_STOPWORDS")]
  locative: Vec<String>,
}

pub(crate) static COUNTRY_LABELS: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
  let file = Dictionaries::get("countries.yml").expect("could not read countries dictionary");
  let dictionary = serde_yaml::from_slice::<CountryDictionary>(&file.data).expect("could not unmarshal countries dictionary");

  dictionary.labels.into_iter().map(|(code, label)| (code.to_uppercase(), label)).collect()
});

#[derive(Deserialize)]
struct CountryDictionary {
  #[serde(rename = "COUNTRY_LABELS")]
  labels: HashMap<String, String>,
}

/// NFD-decompose, drop combining marks, recompose. Idempotent, and leaves
/// non-Latin scripts alone.
pub fn normalize_text(input: &str) -> String {
  input.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

#[inline]
fn is_combining_mark(c: char) -> bool {
  matches!(
    get_general_category(c),
    GeneralCategory::NonspacingMark | GeneralCategory::SpacingMark | GeneralCategory::EnclosingMark
  )
}

/// Comparison form of a name: diacritics stripped, lower-cased, everything
/// outside [a-z0-9 space] removed, whitespace collapsed.
pub fn lower_and_strip_punctuation(input: &str) -> String {
  let lowered = normalize_text(input).to_lowercase();
  let mut out = String::with_capacity(lowered.len());
  let mut pending_space = false;

  for c in lowered.chars() {
    if c.is_whitespace() {
      pending_space = true;
    } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
      if pending_space && !out.is_empty() {
        out.push(' ');
      }

      pending_space = false;
      out.push(c);
    }
  }

  out
}

pub fn tokenize(input: &str) -> impl Iterator<Item = &str> {
  input.split_whitespace()
}

/// Drop stopword tokens unless asked to keep them. Falls back to the
/// original tokens when stripping would leave nothing to compare.
pub(crate) fn strip_stopwords<'s>(tokens: &[&'s str], keep: bool) -> Vec<&'s str> {
  if keep {
    return tokens.to_vec();
  }

  let kept = tokens.iter().copied().filter(|token| !STOPWORDS.contains(*token)).collect::<Vec<_>>();

  match kept.is_empty() {
    true => tokens.to_vec(),
    false => kept,
  }
}

/// Comparison form of a government identifier: upper-case alphanumerics only.
pub fn normalize_identifier(input: &str) -> String {
  input.chars().filter(char::is_ascii_alphanumeric).map(|c| c.to_ascii_uppercase()).collect()
}

/// Strip phone punctuation; an empty remainder means no phone at all.
pub fn normalize_phone(input: &str) -> Option<String> {
  let cleaned = input.chars().filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')' | '.')).collect::<String>();

  (!cleaned.is_empty()).then_some(cleaned)
}

/// Resolve a country to its display label: the screening-preferred overrides
/// first, then ISO 3166 alpha-2/alpha-3, otherwise the trimmed input as-is.
pub fn normalize_country(input: &str) -> String {
  let trimmed = input.trim();

  if trimmed.is_empty() {
    return String::new();
  }

  let code = trimmed.to_uppercase();

  if let Some(label) = COUNTRY_LABELS.get(&code) {
    return label.clone();
  }

  match code.len() {
    2 => celes::Country::from_alpha2(&code).map(|country| country.long_name.to_string()).unwrap_or_else(|_| trimmed.to_string()),
    3 => celes::Country::from_alpha3(&code).map(|country| country.long_name.to_string()).unwrap_or_else(|_| trimmed.to_string()),
    _ => trimmed.to_string(),
  }
}

/// Address-field form: diacritics stripped, lower-cased, commas removed,
/// whitespace collapsed. Other punctuation survives for the token comparison
/// to absorb.
pub(crate) fn clean_address_field(input: &str) -> String {
  normalize_text(input).to_lowercase().replace(',', " ").split_whitespace().join(" ")
}

#[cfg(test)]
mod tests {
  use super::{COUNTRY_LABELS, STOPWORDS};

  #[test]
  fn dictionaries_load() {
    assert!(STOPWORDS.len() > 20);
    assert!(STOPWORDS.contains("llc"));
    assert!(COUNTRY_LABELS.len() > 20);
  }

  #[test]
  fn normalize_text_strips_marks_and_keeps_scripts() {
    assert_eq!(super::normalize_text("José García"), "Jose Garcia");
    assert_eq!(super::normalize_text("Müller"), "Muller");
    assert_eq!(super::normalize_text("plain ascii"), "plain ascii");
    assert_eq!(super::normalize_text("Владимир Путин"), "Владимир Путин");
    assert_eq!(super::normalize_text("محمد"), "محمد");
  }

  #[test]
  fn normalize_text_is_idempotent() {
    for input in ["José García", "Müller, Jürgen", "Đặng Thái Sơn", "no marks at all", ""] {
      let once = super::normalize_text(input);

      assert_eq!(super::normalize_text(&once), once);
    }
  }

  #[test]
  fn lower_and_strip_punctuation() {
    assert_eq!(super::lower_and_strip_punctuation("AL-JASIM, Muhammad Husayn"), "aljasim muhammad husayn");
    assert_eq!(super::lower_and_strip_punctuation("  José   GARCÍA  "), "jose garcia");
    assert_eq!(super::lower_and_strip_punctuation("No.3 Avenue"), "no3 avenue");
    assert_eq!(super::lower_and_strip_punctuation("!!!"), "");
    assert_eq!(super::lower_and_strip_punctuation(""), "");
  }

  #[test]
  fn strip_stopwords() {
    assert_eq!(super::strip_stopwords(&["zincum", "llc"], false), vec!["zincum"]);
    assert_eq!(super::strip_stopwords(&["zincum", "llc"], true), vec!["zincum", "llc"]);
    assert_eq!(super::strip_stopwords(&["abu", "sayyaf", "group"], false), vec!["abu", "sayyaf", "group"]);
    // Stripping never empties a name outright.
    assert_eq!(super::strip_stopwords(&["the", "company"], false), vec!["the", "company"]);
  }

  #[test]
  fn normalize_identifier() {
    assert_eq!(super::normalize_identifier("j-123 456/a"), "J123456A");
    assert_eq!(super::normalize_identifier("A1234567"), "A1234567");
    assert_eq!(super::normalize_identifier("--//"), "");
  }

  #[test]
  fn normalize_phone() {
    assert_eq!(super::normalize_phone("+1 (555) 123-45.67"), Some("15551234567".to_string()));
    assert_eq!(super::normalize_phone("+ () -."), None);
    assert_eq!(super::normalize_phone(""), None);
  }

  #[test]
  fn normalize_country() {
    assert_eq!(super::normalize_country("GB"), "United Kingdom");
    assert_eq!(super::normalize_country("uk"), "United Kingdom");
    assert_eq!(super::normalize_country("KP"), "North Korea");
    assert_eq!(super::normalize_country("USA"), "United States");
    assert_eq!(super::normalize_country("FRA"), "France");
    assert_eq!(super::normalize_country(" Ruritania "), "Ruritania");
    assert_eq!(super::normalize_country(""), "");
  }

  #[test]
  fn clean_address_field() {
    assert_eq!(super::clean_address_field("No.3, New York Avenue,"), "no.3 new york avenue");
    assert_eq!(super::clean_address_field("  Gran Vía, 12 "), "gran via 12");
  }
}
