use std::time::{Duration, Instant};

use ahash::HashMap;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;

use crate::model::ScoreBreakdown;

/// Pipeline phase a [`ScoringEvent`] was emitted from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum TracePhase {
  Normalization,
  Tokenization,
  NameComparison,
  AltNameComparison,
  AddressComparison,
  GovIdComparison,
  CryptoComparison,
  ContactComparison,
  DateComparison,
  Aggregation,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoringEvent {
  pub at: Timestamp,
  pub phase: TracePhase,
  pub label: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<HashMap<&'static str, Value>>,
}

/// Recorded outcome of one traced request.
#[derive(Clone, Debug, Serialize)]
pub struct ScoringTrace {
  pub session_id: String,
  pub events: Vec<ScoringEvent>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub breakdown: Option<ScoreBreakdown>,
  pub duration: Duration,
}

/// Per-request event recorder.
///
/// A disabled context accepts every call and does nothing: the lazy data
/// suppliers are never evaluated, so production requests pay nothing for the
/// tracing hooks.
#[derive(Debug, Default)]
pub struct ScoringContext {
  inner: Option<TraceState>,
}

#[derive(Debug)]
struct TraceState {
  session_id: String,
  started: Instant,
  events: Vec<ScoringEvent>,
  breakdown: Option<ScoreBreakdown>,
}

impl ScoringContext {
  pub fn disabled() -> ScoringContext {
    ScoringContext { inner: None }
  }

  pub fn enabled(session_id: impl Into<String>) -> ScoringContext {
    ScoringContext {
      inner: Some(TraceState {
        session_id: session_id.into(),
        started: Instant::now(),
        events: Vec::new(),
        breakdown: None,
      }),
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.inner.is_some()
  }

  /// Record an event, evaluating `data` only when the context is enabled.
  #[inline]
  pub(crate) fn record<F>(&mut self, phase: TracePhase, label: &'static str, data: F)
  where
    F: FnOnce() -> HashMap<&'static str, Value>,
  {
    if let Some(state) = &mut self.inner {
      state.events.push(ScoringEvent {
        at: Timestamp::now(),
        phase,
        label,
        data: Some(data()),
      });
    }
  }

  /// A context scoped to one unit of parallel work, merged back with
  /// [`ScoringContext::absorb`].
  pub(crate) fn child(&self) -> ScoringContext {
    match self.inner {
      Some(_) => ScoringContext::enabled(String::new()),
      None => ScoringContext::disabled(),
    }
  }

  pub(crate) fn absorb(&mut self, child: ScoringContext) {
    if let (Some(state), Some(other)) = (&mut self.inner, child.inner) {
      state.events.extend(other.events);
    }
  }

  pub(crate) fn attach_breakdown(&mut self, breakdown: ScoreBreakdown) {
    if let Some(state) = &mut self.inner {
      state.breakdown = Some(breakdown);
    }
  }

  /// Consume the context and produce the trace, if one was recorded.
  pub fn finish(self) -> Option<ScoringTrace> {
    self.inner.map(|state| ScoringTrace {
      session_id: state.session_id,
      duration: state.started.elapsed(),
      events: state.events,
      breakdown: state.breakdown,
    })
  }
}

pub(crate) fn trace_data<const N: usize>(pairs: [(&'static str, Value); N]) -> HashMap<&'static str, Value> {
  pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::{ScoringContext, TracePhase, trace_data};

  #[test]
  fn disabled_context_never_evaluates_suppliers() {
    let mut ctx = ScoringContext::disabled();

    ctx.record(TracePhase::NameComparison, "compared names", || unreachable!("supplier evaluated on a disabled context"));

    assert!(!ctx.is_enabled());
    assert!(ctx.finish().is_none());
  }

  #[test]
  fn enabled_context_collects_events() {
    let mut ctx = ScoringContext::enabled("session-1");

    ctx.record(TracePhase::Normalization, "prepared query", || trace_data([("tokens", json!(2))]));

    let mut child = ctx.child();
    child.record(TracePhase::Aggregation, "scored candidate", || trace_data([("score", json!(0.9))]));
    ctx.absorb(child);

    let trace = ctx.finish().unwrap();

    assert_eq!(trace.session_id, "session-1");
    assert_eq!(trace.events.len(), 2);
    assert_eq!(trace.events[0].phase, TracePhase::Normalization);
    assert_eq!(trace.events[1].label, "scored candidate");
  }

  #[test]
  fn trace_serializes_for_report_storage() {
    let mut ctx = ScoringContext::enabled("session-2");
    ctx.record(TracePhase::Tokenization, "tokenized names", || trace_data([("count", json!(3))]));

    let serialized = serde_json::to_value(ctx.finish().unwrap()).unwrap();

    assert_eq!(serialized["session_id"], "session-2");
    assert_eq!(serialized["events"][0]["phase"], "Tokenization");
    assert_eq!(serialized["events"][0]["data"]["count"], 3);
  }
}
