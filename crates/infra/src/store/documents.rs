use std::collections::HashMap;
use std::sync::RwLock;

use bss_core::{AggregateRoot, DomainError, ExpectedVersion};
use bss_documents::{BillableDocument, DocumentId, DocumentKind};

use super::query::DocumentFilter;
use super::r#trait::{DocumentStore, StoreError};

#[derive(Debug)]
struct Documents<K: DocumentKind> {
    by_id: HashMap<DocumentId, BillableDocument<K>>,
    by_number: HashMap<String, DocumentId>,
}

/// In-memory document store with version compare-and-swap.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryDocumentStore<K: DocumentKind> {
    inner: RwLock<Documents<K>>,
}

impl<K: DocumentKind> InMemoryDocumentStore<K> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Documents {
                by_id: HashMap::new(),
                by_number: HashMap::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|d| d.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: DocumentKind> Default for InMemoryDocumentStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Poisoned("document")
}

impl<K: DocumentKind> DocumentStore<K> for InMemoryDocumentStore<K> {
    fn insert(&self, document: BillableDocument<K>) -> Result<(), StoreError> {
        let mut docs = self.inner.write().map_err(poisoned)?;
        let id = *document.id();

        if docs.by_id.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", K::NAME)).into());
        }
        if let Some(existing) = docs.by_number.get(document.number()) {
            return Err(DomainError::conflict(format!(
                "{} number {} is already used by {existing}",
                K::NAME,
                document.number()
            ))
            .into());
        }

        docs.by_number.insert(document.number().to_string(), id);
        docs.by_id.insert(id, document);
        Ok(())
    }

    fn get(&self, id: DocumentId) -> Result<Option<BillableDocument<K>>, StoreError> {
        let docs = self.inner.read().map_err(poisoned)?;
        Ok(docs.by_id.get(&id).cloned())
    }

    fn find_by_number(&self, number: &str) -> Result<Option<BillableDocument<K>>, StoreError> {
        let docs = self.inner.read().map_err(poisoned)?;
        Ok(docs
            .by_number
            .get(number)
            .and_then(|id| docs.by_id.get(id))
            .cloned())
    }

    fn replace(
        &self,
        document: BillableDocument<K>,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let mut docs = self.inner.write().map_err(poisoned)?;
        let id = *document.id();

        let stored = docs
            .by_id
            .get(&id)
            .ok_or_else(|| DomainError::not_found(K::NAME, id))?;

        let current = stored.version();
        expected.check(current)?;
        if document.version() <= current {
            return Err(DomainError::invariant(format!(
                "{} {id} version must advance past {current}, got {}",
                K::NAME,
                document.version()
            ))
            .into());
        }
        if stored.number() != document.number() {
            return Err(DomainError::invariant(format!(
                "{} number cannot change ({} -> {})",
                K::NAME,
                stored.number(),
                document.number()
            ))
            .into());
        }

        docs.by_id.insert(id, document);
        Ok(())
    }

    fn remove(&self, id: DocumentId) -> Result<Option<BillableDocument<K>>, StoreError> {
        let mut docs = self.inner.write().map_err(poisoned)?;
        let removed = docs.by_id.remove(&id);
        if let Some(doc) = &removed {
            docs.by_number.remove(doc.number());
        }
        Ok(removed)
    }

    fn list(
        &self,
        filter: &DocumentFilter<K::Status>,
    ) -> Result<Vec<BillableDocument<K>>, StoreError> {
        let docs = self.inner.read().map_err(poisoned)?;
        let mut out: Vec<_> = docs
            .by_id
            .values()
            .filter(|d| filter.matches(d.customer_id(), d.status()))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.number().cmp(b.number()))
        });
        Ok(out)
    }
}
