use bon::bon;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::matching::{normalize, phonetic::PhoneticKey};

/// Kind of sanctioned subject.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Person,
  Business,
  Vessel,
  Aircraft,
  #[default]
  Unknown,
}

/// Upstream list an entity was sourced from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum SourceList {
  #[default]
  #[serde(rename = "US_OFAC")]
  UsOfac,
  #[serde(rename = "US_CSL")]
  UsCsl,
  #[serde(rename = "US_NON_SDN")]
  UsNonSdn,
  #[serde(rename = "EU_CSL")]
  EuCsl,
  #[serde(rename = "UK_CSL")]
  UkCsl,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, bon::Builder)]
#[builder(on(String, into))]
pub struct Address {
  pub line1: Option<String>,
  pub line2: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernmentIdKind {
  Passport,
  NationalId,
  TaxId,
  BusinessRegistration,
  DriversLicense,
  Other,
}

#[derive(Clone, Debug, Deserialize, Serialize, bon::Builder)]
#[builder(on(String, into))]
pub struct GovernmentId {
  pub identifier: String,
  pub kind: Option<GovernmentIdKind>,
  pub country: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, bon::Builder)]
#[builder(on(String, into))]
pub struct CryptoAddress {
  pub address: String,
  pub currency: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, bon::Builder)]
#[builder(on(String, into))]
pub struct ContactInfo {
  pub email: Option<String>,
  pub phone: Option<String>,
}

/// A calendar date as delivered by the source lists.
///
/// Components are stored raw: upstream data contains typos (a day of 51, a
/// month of 13) that the date comparer is expected to recognize and score,
/// so a validating date type would lose information. Missing components fall
/// back to January 1 on the adapter side.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityDate {
  pub year: i16,
  pub month: i8,
  pub day: i8,
}

impl EntityDate {
  pub const fn new(year: i16, month: i8, day: i8) -> EntityDate {
    EntityDate { year, month, day }
  }

  pub const fn year_only(year: i16) -> EntityDate {
    EntityDate { year, month: 1, day: 1 }
  }
}

/// Lifecycle dates; which fields are meaningful depends on the entity kind.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct LifeDates {
  pub birth: Option<EntityDate>,
  pub death: Option<EntityDate>,
  pub created: Option<EntityDate>,
  pub dissolved: Option<EntityDate>,
  pub built: Option<EntityDate>,
}

/// One sanctioned subject, as delivered by a data-source adapter.
///
/// Raw fields stay untouched; the comparison forms live in the prepared
/// fields, computed when the entity is built or inserted into an index.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Entity {
  pub id: String,
  pub source: SourceList,
  pub kind: EntityKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alt_names: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub addresses: Vec<Address>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub government_ids: Vec<GovernmentId>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub crypto_addresses: Vec<CryptoAddress>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact: Option<ContactInfo>,
  #[serde(default)]
  pub dates: LifeDates,

  /// Free text carried through untouched; the scorer treats it as opaque.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remarks: Option<String>,

  #[serde(skip)]
  pub(crate) prepared: PreparedFields,
}

#[bon]
impl Entity {
  #[builder]
  pub fn builder(
    #[builder(start_fn)] kind: EntityKind,
    #[builder(into)] id: String,
    #[builder(default)] source: SourceList,
    #[builder(into)] source_id: Option<String>,
    #[builder(into)] name: Option<String>,
    alt_names: Option<&[&str]>,
    #[builder(default)] addresses: Vec<Address>,
    #[builder(default)] government_ids: Vec<GovernmentId>,
    #[builder(default)] crypto_addresses: Vec<CryptoAddress>,
    contact: Option<ContactInfo>,
    #[builder(default)] dates: LifeDates,
    #[builder(into)] remarks: Option<String>,
  ) -> Entity {
    let mut entity = Entity {
      id,
      source,
      kind,
      source_id,
      name,
      alt_names: alt_names.unwrap_or_default().iter().map(|s| s.to_string()).collect(),
      addresses,
      government_ids,
      crypto_addresses,
      contact,
      dates,
      remarks,
      prepared: PreparedFields::default(),
    };

    entity.prepare();
    entity
  }
}

impl Entity {
  /// Recompute the comparison forms from the raw fields.
  pub(crate) fn prepare(&mut self) {
    self.prepared = PreparedFields::build(
      self.name.as_deref(),
      &self.alt_names,
      &self.addresses,
      &self.government_ids,
      self.contact.as_ref(),
    );
  }

  pub(crate) fn prepared(&self) -> &PreparedFields {
    &self.prepared
  }
}

/// The query subject: a partially populated entity. Unset fields simply do
/// not contribute to scoring.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alt_names: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub addresses: Vec<Address>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub government_ids: Vec<GovernmentId>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub crypto_addresses: Vec<CryptoAddress>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact: Option<ContactInfo>,
  #[serde(default)]
  pub dates: LifeDates,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<EntityKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_id: Option<String>,

  #[serde(skip)]
  pub(crate) prepared: PreparedFields,
}

#[bon]
impl SearchQuery {
  #[builder]
  pub fn builder(
    #[builder(into)] name: Option<String>,
    alt_names: Option<&[&str]>,
    #[builder(default)] addresses: Vec<Address>,
    #[builder(default)] government_ids: Vec<GovernmentId>,
    #[builder(default)] crypto_addresses: Vec<CryptoAddress>,
    contact: Option<ContactInfo>,
    #[builder(default)] dates: LifeDates,
    kind: Option<EntityKind>,
    #[builder(into)] source_id: Option<String>,
  ) -> SearchQuery {
    let mut query = SearchQuery {
      name,
      alt_names: alt_names.unwrap_or_default().iter().map(|s| s.to_string()).collect(),
      addresses,
      government_ids,
      crypto_addresses,
      contact,
      dates,
      kind,
      source_id,
      prepared: PreparedFields::default(),
    };

    query.precompute();
    query
  }
}

impl SearchQuery {
  /// A name-only query.
  pub fn named(text: &str) -> SearchQuery {
    SearchQuery::builder().name(text).build()
  }

  /// Recompute the comparison forms once, ahead of scoring every candidate.
  pub(crate) fn precompute(&mut self) {
    self.prepared = PreparedFields::build(
      self.name.as_deref(),
      &self.alt_names,
      &self.addresses,
      &self.government_ids,
      self.contact.as_ref(),
    );
  }

  pub(crate) fn prepared(&self) -> &PreparedFields {
    &self.prepared
  }

  /// Nothing left to compare after normalization.
  pub(crate) fn is_unscoreable(&self) -> bool {
    self.prepared.name.is_none()
      && self.prepared.alt_names.is_empty()
      && self.prepared.addresses.is_empty()
      && self.prepared.government_ids.iter().all(|id| id.identifier.is_empty())
      && self.crypto_addresses.iter().all(|wallet| wallet.address.is_empty())
      && self.prepared.email.is_none()
      && self.prepared.phone.is_none()
      && self.source_id.is_none()
  }
}

/// Comparison-normalized name: the raw source text, its normalized form,
/// tokens, and the phonetic key of its sorted leading token.
#[derive(Clone, Debug, Default)]
pub(crate) struct PreparedName {
  pub(crate) source: String,
  pub(crate) full: String,
  pub(crate) tokens: Vec<CompactString>,
  pub(crate) key: Option<PhoneticKey>,
}

impl PreparedName {
  pub(crate) fn of(raw: &str) -> Option<PreparedName> {
    let full = normalize::lower_and_strip_punctuation(raw);

    if full.is_empty() {
      return None;
    }

    let tokens = normalize::tokenize(&full).map(CompactString::from).collect::<Vec<_>>();
    let token_refs = tokens.iter().map(|token| token.as_str()).collect::<Vec<_>>();
    let key = PhoneticKey::of_tokens(normalize::strip_stopwords(&token_refs, false).into_iter());

    Some(PreparedName {
      source: raw.to_string(),
      full,
      tokens,
      key,
    })
  }

  pub(crate) fn token_refs(&self) -> Vec<&str> {
    self.tokens.iter().map(|token| token.as_str()).collect()
  }
}

/// Normalized form of an [`Address`].
#[derive(Clone, Debug, Default)]
pub struct PreparedAddress {
  pub line1: String,
  pub line2: String,
  pub city: String,
  pub line1_tokens: Vec<CompactString>,
  pub line2_tokens: Vec<CompactString>,
  pub city_tokens: Vec<CompactString>,
  pub state: String,
  pub postal_code: String,
  pub country: String,
}

impl PreparedAddress {
  pub(crate) fn of(address: &Address) -> PreparedAddress {
    let line1 = address.line1.as_deref().map(normalize::clean_address_field).unwrap_or_default();
    let line2 = address.line2.as_deref().map(normalize::clean_address_field).unwrap_or_default();
    let city = address.city.as_deref().map(normalize::clean_address_field).unwrap_or_default();

    PreparedAddress {
      line1_tokens: normalize::tokenize(&line1).map(CompactString::from).collect(),
      line2_tokens: normalize::tokenize(&line2).map(CompactString::from).collect(),
      city_tokens: normalize::tokenize(&city).map(CompactString::from).collect(),
      line1,
      line2,
      city,
      state: address.state.as_deref().map(|s| s.trim().to_lowercase()).unwrap_or_default(),
      postal_code: address.postal_code.as_deref().map(|s| s.trim().to_lowercase()).unwrap_or_default(),
      country: address.country.as_deref().map(normalize::normalize_country).unwrap_or_default(),
    }
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.line1.is_empty() && self.line2.is_empty() && self.city.is_empty() && self.state.is_empty() && self.postal_code.is_empty() && self.country.is_empty()
  }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PreparedGovernmentId {
  pub(crate) identifier: String,
  pub(crate) kind: Option<GovernmentIdKind>,
  pub(crate) country: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PreparedFields {
  pub(crate) name: Option<PreparedName>,
  pub(crate) alt_names: Vec<PreparedName>,
  pub(crate) addresses: Vec<PreparedAddress>,
  pub(crate) government_ids: Vec<PreparedGovernmentId>,
  pub(crate) email: Option<String>,
  pub(crate) phone: Option<String>,
}

impl PreparedFields {
  pub(crate) fn build(
    name: Option<&str>,
    alt_names: &[String],
    addresses: &[Address],
    government_ids: &[GovernmentId],
    contact: Option<&ContactInfo>,
  ) -> PreparedFields {
    PreparedFields {
      name: name.and_then(PreparedName::of),
      alt_names: alt_names.iter().filter_map(|alt| PreparedName::of(alt)).collect(),
      addresses: addresses.iter().map(PreparedAddress::of).filter(|prepared| !prepared.is_empty()).collect(),
      government_ids: government_ids
        .iter()
        .map(|id| PreparedGovernmentId {
          identifier: normalize::normalize_identifier(&id.identifier),
          kind: id.kind,
          country: id.country.as_deref().map(normalize::normalize_country).filter(|country| !country.is_empty()),
        })
        .collect(),
      email: contact
        .and_then(|contact| contact.email.as_deref())
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty()),
      phone: contact.and_then(|contact| contact.phone.as_deref()).and_then(normalize::normalize_phone),
    }
  }

  pub(crate) fn phonetic_key(&self) -> Option<&PhoneticKey> {
    self.name.as_ref().and_then(|name| name.key.as_ref())
  }
}

/// Per-factor scores and the final weighted score, all in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
  pub name: f64,
  pub alt_name: f64,
  pub address: f64,
  pub gov_id: f64,
  pub crypto: f64,
  pub contact: f64,
  pub date: f64,
  pub score: f64,
}

impl ScoreBreakdown {
  /// A short-circuit result where every factor is considered matched.
  pub(crate) fn perfect() -> ScoreBreakdown {
    ScoreBreakdown {
      name: 1.0,
      alt_name: 1.0,
      address: 1.0,
      gov_id: 1.0,
      crypto: 1.0,
      contact: 1.0,
      date: 1.0,
      score: 1.0,
    }
  }
}
