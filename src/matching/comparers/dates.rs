use crate::model::{EntityDate, EntityKind, LifeDates};

/// A date comparison above this is presented as a match.
pub(crate) const MATCH_THRESHOLD: f64 = 0.7;

const YEAR_WEIGHT: f64 = 0.4;
const MONTH_WEIGHT: f64 = 0.3;
const DAY_WEIGHT: f64 = 0.3;

/// Lifespans whose ratio exceeds this are treated as describing different
/// people.
const LIFESPAN_TOLERANCE: f64 = 1.21;

/// Weighted year/month/day comparison, tolerant of off-by-a-little values,
/// keyboard transpositions and digit typos.
pub(crate) fn compare_dates(lhs: &EntityDate, rhs: &EntityDate) -> f64 {
  YEAR_WEIGHT * year_score(lhs.year, rhs.year) + MONTH_WEIGHT * month_score(lhs.month, rhs.month) + DAY_WEIGHT * day_score(lhs.day, rhs.day)
}

fn year_score(lhs: i16, rhs: i16) -> f64 {
  match (lhs - rhs).abs() {
    0 => 1.0,
    delta if delta <= 5 => 1.0 - 0.1 * delta as f64,
    _ => 0.2,
  }
}

fn month_score(lhs: i8, rhs: i8) -> f64 {
  if lhs == rhs {
    return 1.0;
  }

  if (lhs - rhs).abs() == 1 {
    return 0.9;
  }

  // A leading 1 fat-fingered into 10, 11 or 12, in either direction.
  let (low, high) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };

  match low == 1 && matches!(high, 10 | 11 | 12) {
    true => 0.7,
    false => 0.3,
  }
}

fn day_score(lhs: i8, rhs: i8) -> f64 {
  let delta = (i16::from(lhs) - i16::from(rhs)).abs();

  if delta == 0 {
    return 1.0;
  }

  if delta <= 3 {
    return 0.95 - 0.05 * delta as f64 / 3.0;
  }

  match digits_similar(lhs, rhs) {
    true => 0.7,
    false => 0.3,
  }
}

/// Reversed two-digit forms (15 vs 51, 12 vs 21) or a single digit against
/// its repetition (1 vs 11).
fn digits_similar(lhs: i8, rhs: i8) -> bool {
  let reversed = |value: i8| (value % 10) * 10 + value / 10;

  reversed(lhs) == rhs || (lhs < 10 && rhs == lhs * 11) || (rhs < 10 && lhs == rhs * 11)
}

/// Whether two birth/death pairs can describe the same subject. Missing
/// dates are inconclusive, a birth after its death is nonsense, and two
/// complete lifespans must be of comparable length.
pub(crate) fn dates_logical(birth1: Option<&EntityDate>, death1: Option<&EntityDate>, birth2: Option<&EntityDate>, death2: Option<&EntityDate>) -> bool {
  let (Some(birth1), Some(death1), Some(birth2), Some(death2)) = (birth1, death1, birth2, death2) else {
    return true;
  };

  let span1 = ordinal(death1) - ordinal(birth1);
  let span2 = ordinal(death2) - ordinal(birth2);

  if span1 < 0.0 || span2 < 0.0 {
    return false;
  }

  let (shorter, longer) = if span1 < span2 { (span1, span2) } else { (span2, span1) };

  if shorter == 0.0 {
    return longer == 0.0;
  }

  longer / shorter <= LIFESPAN_TOLERANCE
}

// Approximate day ordinal; exact calendars are pointless when the inputs can
// hold a day of 51.
fn ordinal(date: &EntityDate) -> f64 {
  f64::from(date.year) * 365.25 + f64::from(date.month) * 30.44 + f64::from(date.day)
}

/// Average of the applicable date comparisons for the entity kind, or `None`
/// when no pair was comparable. Illogical person lifespans halve the score.
pub(crate) fn compare_life_dates(kind: EntityKind, query: &LifeDates, candidate: &LifeDates) -> Option<f64> {
  let pairs: &[(Option<EntityDate>, Option<EntityDate>)] = match kind {
    EntityKind::Person => &[(query.birth, candidate.birth), (query.death, candidate.death)],
    EntityKind::Business => &[(query.created, candidate.created), (query.dissolved, candidate.dissolved)],
    EntityKind::Vessel | EntityKind::Aircraft => &[(query.built, candidate.built)],
    EntityKind::Unknown => &[
      (query.birth, candidate.birth),
      (query.death, candidate.death),
      (query.created, candidate.created),
      (query.dissolved, candidate.dissolved),
      (query.built, candidate.built),
    ],
  };

  let mut total = 0.0;
  let mut compared = 0;

  for (query_date, candidate_date) in pairs {
    if let (Some(query_date), Some(candidate_date)) = (query_date, candidate_date) {
      total += compare_dates(query_date, candidate_date);
      compared += 1;
    }
  }

  if compared == 0 {
    return None;
  }

  let mut score = total / compared as f64;

  if kind == EntityKind::Person && !dates_logical(query.birth.as_ref(), query.death.as_ref(), candidate.birth.as_ref(), candidate.death.as_ref()) {
    score *= 0.5;
  }

  Some(score)
}

pub(crate) fn is_match(score: f64) -> bool {
  score > MATCH_THRESHOLD
}
