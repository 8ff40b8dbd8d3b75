use validator::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum VigiaError {
  #[error("invalid configuration: {field}: {reason}")]
  InvalidConfig { field: String, reason: String },
}

impl VigiaError {
  pub(crate) fn from_validation(scope: &str, errors: &ValidationErrors) -> VigiaError {
    for (field, failures) in errors.field_errors() {
      if let Some(failure) = failures.first() {
        return VigiaError::InvalidConfig {
          field: format!("{scope}.{field}"),
          reason: failure.message.as_ref().map(|message| message.to_string()).unwrap_or_else(|| failure.code.to_string()),
        };
      }
    }

    VigiaError::InvalidConfig {
      field: scope.to_string(),
      reason: "validation failed".to_string(),
    }
  }
}
