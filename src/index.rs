use std::sync::{Arc, PoisonError, RwLock};

use ahash::HashMap;

use crate::model::{Entity, EntityKind, SourceList};

/// In-memory container of prepared entities.
///
/// Readers acquire an immutable snapshot for the duration of a query;
/// mutation builds a fresh snapshot and swaps it in, so in-flight readers
/// keep observing the one they hold.
#[derive(Debug, Default)]
pub struct EntityIndex {
  snapshot: RwLock<Arc<Snapshot>>,
}

#[derive(Debug, Default)]
pub(crate) struct Snapshot {
  entities: Vec<Arc<Entity>>,
  by_id: HashMap<String, usize>,
}

impl Snapshot {
  pub(crate) fn entities(&self) -> &[Arc<Entity>] {
    &self.entities
  }
}

impl EntityIndex {
  pub fn new() -> EntityIndex {
    EntityIndex::default()
  }

  /// Insert a batch of entities, preparing their comparison fields. An
  /// entity with a known id replaces the previous entry in place, keeping
  /// the iteration order stable.
  pub fn upsert_all(&self, entities: Vec<Entity>) {
    if entities.is_empty() {
      return;
    }

    let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);

    let mut next = Snapshot {
      entities: guard.entities.clone(),
      by_id: guard.by_id.clone(),
    };

    for mut entity in entities {
      entity.prepare();

      match next.by_id.get(&entity.id) {
        Some(&position) => next.entities[position] = Arc::new(entity),

        None => {
          next.by_id.insert(entity.id.clone(), next.entities.len());
          next.entities.push(Arc::new(entity));
        }
      }
    }

    tracing::debug!(entities = next.entities.len(), "swapped in new index snapshot");

    *guard = Arc::new(next);
  }

  pub fn clear(&self) {
    let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);

    *guard = Arc::new(Snapshot::default());
  }

  pub fn len(&self) -> usize {
    self.acquire().entities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.acquire().entities.is_empty()
  }

  /// Look an entity up by id; an unknown id is an absent result, never an
  /// error.
  pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
    let snapshot = self.acquire();

    snapshot.by_id.get(id).map(|&position| snapshot.entities[position].clone())
  }

  pub fn iter_all(&self) -> Vec<Arc<Entity>> {
    self.acquire().entities.to_vec()
  }

  pub fn of_kind(&self, kind: EntityKind) -> Vec<Arc<Entity>> {
    self.acquire().entities.iter().filter(|entity| entity.kind == kind).cloned().collect()
  }

  pub fn of_source(&self, source: SourceList) -> Vec<Arc<Entity>> {
    self.acquire().entities.iter().filter(|entity| entity.source == source).cloned().collect()
  }

  pub(crate) fn acquire(&self) -> Arc<Snapshot> {
    self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
  }
}
