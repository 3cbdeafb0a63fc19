// ============================================================================
// Editing Session
// ============================================================================
//
// Owns the document being edited and the store that mirrors it. Every
// mutation writes the full document back before returning.

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::model::{Client, Document, DocumentFlags, DocumentKind, LineItem};
use crate::store::{self, KeyValueStore};
use rust_decimal::Decimal;

pub struct DocumentSession<S: KeyValueStore> {
    document: Document,
    store: S,
}

impl<S: KeyValueStore> DocumentSession<S> {
    /// Restore the document for `kind` from `store` (or start a new one).
    pub fn open(store: S, kind: DocumentKind, clock: &dyn Clock) -> Self {
        let document = store::load(&store, kind, clock);
        DocumentSession { document, store }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_parts(self) -> (Document, S) {
        (self.document, self.store)
    }

    /// Apply `change` to the document, then save it.
    fn mutate(&mut self, change: impl FnOnce(&mut Document)) -> Result<()> {
        change(&mut self.document);
        store::save(&mut self.store, &self.document)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.document.items.len() {
            Ok(())
        } else {
            Err(AppError::Item {
                index,
                len: self.document.items.len(),
            })
        }
    }

    pub fn update_client(&mut self, edit: impl FnOnce(&mut Client)) -> Result<()> {
        self.mutate(|doc| edit(&mut doc.client))
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        let subject = subject.into();
        self.mutate(|doc| doc.subject = subject)
    }

    /// Append a line item and return its index.
    pub fn add_item(&mut self, item: LineItem) -> Result<usize> {
        self.mutate(|doc| doc.items.push(item))?;
        Ok(self.document.items.len() - 1)
    }

    pub fn update_item(&mut self, index: usize, edit: impl FnOnce(&mut LineItem)) -> Result<()> {
        self.check_index(index)?;
        self.mutate(|doc| edit(&mut doc.items[index]))
    }

    /// Remove a line item. The list may become empty; rendering inserts a
    /// placeholder row when that happens.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem> {
        self.check_index(index)?;
        let removed = self.document.items.remove(index);
        store::save(&mut self.store, &self.document)?;
        Ok(removed)
    }

    pub fn update_flags(&mut self, edit: impl FnOnce(&mut DocumentFlags)) -> Result<()> {
        self.mutate(|doc| edit(&mut doc.flags))
    }

    pub fn set_manual_total(&mut self, value: Option<Decimal>) -> Result<()> {
        self.update_flags(|flags| match value {
            Some(v) => {
                flags.manual_total_override = true;
                flags.manual_total_value = v;
            }
            None => flags.manual_total_override = false,
        })
    }

    /// Discard the current content and start over with one blank item.
    pub fn reset(&mut self, clock: &dyn Clock) -> Result<()> {
        let kind = self.document.kind;
        self.mutate(|doc| *doc = Document::new(kind, clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::NaiveDateTime;

    fn clock() -> FixedClock {
        FixedClock(NaiveDateTime::default())
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let mut backing = MemoryStore::new();
        {
            let mut session = DocumentSession::open(&mut backing, DocumentKind::Quote, &clock());
            session.update_client(|c| c.name = "Durand".into()).unwrap();
            session
                .update_item(0, |item| {
                    item.designation = "Pose carrelage".into();
                    item.unit_price = Decimal::from(500);
                })
                .unwrap();
            session.set_manual_total(Some(Decimal::from(800))).unwrap();
        }
        let restored = store::load(&backing, DocumentKind::Quote, &clock());
        assert_eq!(restored.client.name, "Durand");
        assert_eq!(restored.items[0].designation, "Pose carrelage");
        assert!(restored.flags.manual_total_override);
        assert_eq!(restored.flags.manual_total_value, Decimal::from(800));
    }

    #[test]
    fn test_remove_last_item_then_reload_restores_placeholder() {
        let mut session = DocumentSession::open(MemoryStore::new(), DocumentKind::Invoice, &clock());
        session.remove_item(0).unwrap();
        assert!(session.document().items.is_empty());
        let (_, backing) = session.into_parts();
        let restored = store::load(&backing, DocumentKind::Invoice, &clock());
        assert_eq!(restored.items, vec![LineItem::blank()]);
    }

    #[test]
    fn test_bad_index_is_an_error() {
        let mut session = DocumentSession::open(MemoryStore::new(), DocumentKind::Quote, &clock());
        let err = session.update_item(3, |_| {}).unwrap_err();
        assert!(matches!(err, AppError::Item { index: 3, len: 1 }));
    }

    #[test]
    fn test_add_item_returns_index() {
        let mut session = DocumentSession::open(MemoryStore::new(), DocumentKind::Quote, &clock());
        let idx = session.add_item(LineItem::blank()).unwrap();
        assert_eq!(idx, 1);
        session.reset(&clock()).unwrap();
        assert_eq!(session.document().items.len(), 1);
    }
}
