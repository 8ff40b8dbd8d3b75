use bumpalo::{Bump, collections::Vec as BumpVec};

use crate::{config::SimilarityConfig, matching::normalize};

/// Tuned Jaro–Winkler over two comparison-normalized strings.
///
/// Deviations from the textbook metric, all driven by configuration: tokens
/// of sufficiently different lengths score zero outright, the matched-letter
/// term is dampened by the different-letter penalty, a further penalty
/// scales with the length difference, and the usual prefix boost only
/// applies above the boost threshold.
pub(crate) fn jaro_winkler(bump: &Bump, cfg: &SimilarityConfig, a: &str, b: &str) -> f64 {
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }

  if a == b {
    return 1.0;
  }

  let a_chars = BumpVec::from_iter_in(a.chars(), bump);
  let b_chars = BumpVec::from_iter_in(b.chars(), bump);

  let short = a_chars.len().min(b_chars.len());
  let long = a_chars.len().max(b_chars.len());

  if (short as f64) < long as f64 * cfg.length_difference_cutoff_factor {
    return 0.0;
  }

  let window = (long / 2).saturating_sub(1);

  let mut b_taken = BumpVec::from_iter_in(std::iter::repeat_n(false, b_chars.len()), bump);
  let mut a_matched = BumpVec::with_capacity_in(short, bump);

  for (i, c) in a_chars.iter().enumerate() {
    let start = i.saturating_sub(window);
    let end = (i + window + 1).min(b_chars.len());

    for j in start..end {
      if !b_taken[j] && b_chars[j] == *c {
        b_taken[j] = true;
        a_matched.push(*c);
        break;
      }
    }
  }

  let matches = a_matched.len();

  if matches == 0 {
    return 0.0;
  }

  let mut b_matched = BumpVec::with_capacity_in(matches, bump);

  for (j, taken) in b_taken.iter().enumerate() {
    if *taken {
      b_matched.push(b_chars[j]);
    }
  }

  let transposed = a_matched.iter().zip(b_matched.iter()).filter(|(x, y)| x != y).count();

  let m = matches as f64;
  let t = transposed as f64 / 2.0;
  let w = cfg.different_letter_penalty_weight;

  let mut score = (m / a_chars.len() as f64 + m / b_chars.len() as f64 + w * (m - t) / m) / 3.0;

  score -= cfg.length_difference_penalty_weight * (long - short) as f64 / long as f64;

  if score >= cfg.jaro_winkler_boost_threshold {
    let prefix = a_chars.iter().zip(b_chars.iter()).take(cfg.jaro_winkler_prefix_size).take_while(|(x, y)| x == y).count();

    score += prefix as f64 * 0.1 * (1.0 - score);
  }

  score.clamp(0.0, 1.0)
}

/// Greedy best-pair assignment between indexed tokens and query tokens.
///
/// Every unpaired indexed token costs `unmatched_index_token_weight`; the sum
/// is averaged over the longer side.
pub(crate) fn best_pair(bump: &Bump, cfg: &SimilarityConfig, index_tokens: &[&str], query_tokens: &[&str]) -> f64 {
  if index_tokens.is_empty() || query_tokens.is_empty() {
    return 0.0;
  }

  let (matched, pairs) = select_pairs(bump, cfg, index_tokens, query_tokens, |_, _| 0);
  let unmatched = (index_tokens.len() - pairs) as f64;

  let score = (matched - cfg.unmatched_index_token_weight * unmatched) / index_tokens.len().max(query_tokens.len()) as f64;

  score.clamp(0.0, 1.0)
}

/// Best-pair variant used for final name scoring.
///
/// Scores are averaged per indexed token, perfect per-token matches earn the
/// configured favoritism, pair selection prefers nearby token positions, and
/// lopsided token counts are penalized (a longer indexed name against a
/// short query is scaled down, a single indexed token can never fully match
/// a multi-token query).
pub(crate) fn best_pair_favoring(bump: &Bump, cfg: &SimilarityConfig, index_tokens: &[&str], query_tokens: &[&str]) -> f64 {
  if index_tokens.is_empty() || query_tokens.is_empty() {
    return 0.0;
  }

  let na = index_tokens.len();
  let nb = query_tokens.len();

  let mut score = if nb <= 5 && na > nb {
    // Short query against a longer indexed name: every indexed token takes
    // its best score so unmatched tokens drag the average down.
    let mut total = 0.0;

    for index_token in index_tokens {
      let mut best = 0.0f64;

      for query_token in query_tokens {
        best = best.max(jaro_winkler(bump, cfg, index_token, query_token));
      }

      if best >= 1.0 {
        best += cfg.exact_match_favoritism;
      }

      total += best;
    }

    total / na as f64
  } else {
    let adjacent = cfg.adjacent_similarity_positions;
    let favoritism = cfg.exact_match_favoritism;

    let (matched, pairs) = select_pairs(bump, cfg, index_tokens, query_tokens, |i, j| {
      let distance = i.abs_diff(j);

      match distance <= adjacent {
        true => distance,
        false => adjacent + 1 + distance,
      }
    });

    let unmatched = (na - pairs) as f64;
    let favored = matched + favoritism * count_exact_pairs(bump, cfg, index_tokens, query_tokens);

    (favored - cfg.unmatched_index_token_weight * unmatched) / na as f64
  };

  if na > nb && na > 3 && nb > 3 {
    score *= nb as f64 / na as f64;
  }

  if na == 1 && nb > 1 {
    score = score.min(0.9);
  }

  score.clamp(0.0, 1.0)
}

/// Greedy selection of the highest-scoring cells of the similarity matrix,
/// each row and column used at most once. `tie_rank` orders equal scores
/// (lower ranks first).
fn select_pairs(bump: &Bump, cfg: &SimilarityConfig, index_tokens: &[&str], query_tokens: &[&str], tie_rank: impl Fn(usize, usize) -> usize) -> (f64, usize) {
  let mut cells = BumpVec::with_capacity_in(index_tokens.len() * query_tokens.len(), bump);

  for (i, index_token) in index_tokens.iter().enumerate() {
    for (j, query_token) in query_tokens.iter().enumerate() {
      let score = jaro_winkler(bump, cfg, index_token, query_token);

      if score > 0.0 {
        cells.push((score, tie_rank(i, j), i, j));
      }
    }
  }

  cells.sort_unstable_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));

  let mut row_taken = BumpVec::from_iter_in(std::iter::repeat_n(false, index_tokens.len()), bump);
  let mut col_taken = BumpVec::from_iter_in(std::iter::repeat_n(false, query_tokens.len()), bump);

  let mut matched = 0.0;
  let mut pairs = 0;
  let most = index_tokens.len().min(query_tokens.len());

  for (score, _, i, j) in cells {
    if pairs == most {
      break;
    }

    if !row_taken[i] && !col_taken[j] {
      row_taken[i] = true;
      col_taken[j] = true;
      matched += score;
      pairs += 1;
    }
  }

  (matched, pairs)
}

fn count_exact_pairs(bump: &Bump, cfg: &SimilarityConfig, index_tokens: &[&str], query_tokens: &[&str]) -> f64 {
  let mut count = 0usize;

  for index_token in index_tokens {
    if query_tokens.iter().any(|query_token| jaro_winkler(bump, cfg, index_token, query_token) >= 1.0) {
      count += 1;
    }
  }

  count as f64
}

/// Stopword-aware tokenized similarity over raw strings. Stopwords are only
/// stripped from the candidate (indexed) side.
pub(crate) fn tokenized(bump: &Bump, cfg: &SimilarityConfig, candidate: &str, query: &str, favoring: bool) -> f64 {
  let candidate = normalize::lower_and_strip_punctuation(candidate);
  let query = normalize::lower_and_strip_punctuation(query);

  let candidate_tokens = normalize::tokenize(&candidate).collect::<Vec<_>>();
  let query_tokens = normalize::tokenize(&query).collect::<Vec<_>>();

  tokenized_prepared(bump, cfg, &candidate_tokens, &query_tokens, favoring)
}

/// Same as [`tokenized`], over tokens that were normalized ahead of time.
pub(crate) fn tokenized_prepared(bump: &Bump, cfg: &SimilarityConfig, candidate_tokens: &[&str], query_tokens: &[&str], favoring: bool) -> f64 {
  let candidate_tokens = normalize::strip_stopwords(candidate_tokens, cfg.keep_stopwords);

  match favoring {
    true => best_pair_favoring(bump, cfg, &candidate_tokens, query_tokens),
    false => best_pair(bump, cfg, &candidate_tokens, query_tokens),
  }
}
