// ============================================================================
// Persistence
// ============================================================================
//
// Persistence of the in-progress document.
//
// The whole document is written as one JSON payload under a key derived
// from its kind (`quoteForm` / `invoiceForm`). Each save replaces the
// previous value. Loading never fails on bad data: an absent or unreadable
// slot gives a fresh document and damaged fields fall back to defaults.

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::lenient::{self, TIMESTAMP_FORMAT};
use crate::model::{Client, Document, DocumentFlags, DocumentKind, LineItem};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A string-valued key/value slot store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-process store, used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Store(format!("{}: {}", dir.display(), e)))?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("{}.json", sanitized))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Store(format!("{}: {}", path.display(), e))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key);
        // Write beside the target and rename so a reader never sees half a payload.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| AppError::Store(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).map_err(|e| {
            fs::remove_file(&tmp).ok();
            AppError::Store(format!("{}: {}", path.display(), e))
        })
    }
}

// ============================================================================
// Stored payload
// ============================================================================

/// On-disk shape of a document. The kind is not trusted from the payload;
/// the slot it was read from decides it.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredDocument {
    #[serde(deserialize_with = "lenient::uuid")]
    id: Option<Uuid>,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "lenient::timestamp"
    )]
    created_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient::string")]
    subject: String,
    #[serde(deserialize_with = "lenient::object")]
    client: Client,
    #[serde(deserialize_with = "lenient::list")]
    items: Vec<LineItem>,
    #[serde(deserialize_with = "lenient::object")]
    flags: DocumentFlags,
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(at) => serializer.serialize_str(&at.format(TIMESTAMP_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

impl From<&Document> for StoredDocument {
    fn from(doc: &Document) -> Self {
        StoredDocument {
            id: Some(doc.id),
            created_at: Some(doc.created_at),
            subject: doc.subject.clone(),
            client: doc.client.clone(),
            items: doc.items.clone(),
            flags: doc.flags.clone(),
        }
    }
}

/// Serialize the full document into the slot for its kind, replacing
/// whatever was there.
pub fn save<S: KeyValueStore + ?Sized>(store: &mut S, document: &Document) -> Result<()> {
    let payload = serde_json::to_string(&StoredDocument::from(document))?;
    store.set(document.kind.storage_key(), &payload)?;
    log::debug!(
        "saved {} ({} items) to slot {}",
        document.kind,
        document.items.len(),
        document.kind.storage_key()
    );
    Ok(())
}

/// Restore the document for `kind`, or start a fresh one.
pub fn load<S: KeyValueStore + ?Sized>(store: &S, kind: DocumentKind, clock: &dyn Clock) -> Document {
    let key = kind.storage_key();
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Document::new(kind, clock.now()),
        Err(e) => {
            log::warn!("could not read slot {}: {}; starting a new {}", key, e, kind);
            return Document::new(kind, clock.now());
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            log::warn!("slot {} holds {} instead of a document; starting a new {}", key, other, kind);
            return Document::new(kind, clock.now());
        }
        Err(e) => {
            log::warn!("slot {} is not valid JSON ({}); starting a new {}", key, e, kind);
            return Document::new(kind, clock.now());
        }
    };
    // Every field is lenient, so an object always converts.
    let stored: StoredDocument = serde_json::from_value(value).unwrap_or_default();

    let mut document = Document {
        kind,
        id: stored.id.unwrap_or_else(Uuid::new_v4),
        created_at: stored.created_at.unwrap_or_else(|| clock.now()),
        subject: stored.subject,
        client: stored.client,
        items: stored.items,
        flags: stored.flags,
    };
    if document.ensure_renderable() {
        log::info!("slot {} had no line items; added a blank one", key);
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
        )
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_slot_gives_fresh_document() {
        let store = MemoryStore::new();
        let doc = load(&store, DocumentKind::Quote, &clock());
        assert_eq!(doc.items, vec![LineItem::blank()]);
        assert_eq!(doc.created_at, clock().now());
        assert_eq!(doc.client, Client::default());
    }

    #[test]
    fn test_garbage_slot_gives_fresh_document() {
        let mut store = MemoryStore::new();
        store.set("invoiceForm", "{not json").unwrap();
        let doc = load(&store, DocumentKind::Invoice, &clock());
        assert_eq!(doc.items.len(), 1);

        store.set("invoiceForm", "[1, 2, 3]").unwrap();
        let doc = load(&store, DocumentKind::Invoice, &clock());
        assert_eq!(doc.items.len(), 1);
    }

    #[test]
    fn test_partial_payload_is_repaired_per_field() {
        let mut store = MemoryStore::new();
        store
            .set(
                "quoteForm",
                r#"{
                    "client": {"name": "Durand", "email": null},
                    "items": [
                        {"designation": "Pose", "quantity": "2", "unitPrice": "abc"},
                        "junk",
                        {"designation": "Joint", "unitPrice": 12.5}
                    ],
                    "flags": {"vatExempt": "true", "depositAmount": -20}
                }"#,
            )
            .unwrap();
        let doc = load(&store, DocumentKind::Quote, &clock());
        assert_eq!(doc.client.name, "Durand");
        assert_eq!(doc.client.email, "");
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].quantity, 2);
        assert_eq!(doc.items[0].unit_price, Decimal::ZERO);
        assert_eq!(doc.items[1].quantity, 1);
        assert_eq!(doc.items[1].unit_price, dec("12.5"));
        assert!(doc.flags.vat_exempt);
        assert_eq!(doc.flags.deposit_amount, Decimal::ZERO);
    }

    #[test]
    fn test_save_overwrites_slot_for_kind_only() {
        let mut store = MemoryStore::new();
        let mut doc = Document::new(DocumentKind::Quote, clock().now());
        doc.subject = "Salle de bains".into();
        save(&mut store, &doc).unwrap();
        doc.subject = "Cuisine".into();
        save(&mut store, &doc).unwrap();

        assert!(store.get("invoiceForm").unwrap().is_none());
        let restored = load(&store, DocumentKind::Quote, &clock());
        assert_eq!(restored.subject, "Cuisine");
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("devis-pdf-store-{}", Uuid::new_v4()));
        let mut store = FileStore::open(&dir).unwrap();
        assert!(store.get("quoteForm").unwrap().is_none());
        store.set("quoteForm", "{}").unwrap();
        assert_eq!(store.get("quoteForm").unwrap().as_deref(), Some("{}"));
        assert!(!dir.join("quoteForm.json.tmp").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_failed_write_leaves_no_temp_file() {
        let dir = std::env::temp_dir().join(format!("devis-pdf-store-{}", Uuid::new_v4()));
        let mut store = FileStore::open(&dir).unwrap();
        fs::create_dir_all(dir.join("quoteForm.json").join("occupied")).unwrap();

        assert!(matches!(store.set("quoteForm", "{}"), Err(AppError::Store(_))));
        assert!(!dir.join("quoteForm.json.tmp").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
