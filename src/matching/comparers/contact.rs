use crate::model::PreparedFields;

/// Normalized email or phone equality; either one is enough.
pub(crate) fn compare(query: &PreparedFields, candidate: &PreparedFields) -> f64 {
  if let (Some(query_email), Some(candidate_email)) = (&query.email, &candidate.email)
    && query_email == candidate_email
  {
    return 1.0;
  }

  if let (Some(query_phone), Some(candidate_phone)) = (&query.phone, &candidate.phone)
    && query_phone == candidate_phone
  {
    return 1.0;
  }

  0.0
}
