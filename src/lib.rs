// devis-pdf: Quotes and invoices for a small trade business. Keeps the form
// being edited in a key/value store, computes its totals and lays it out as a
// paginated A4 PDF.

pub mod clock;
pub mod config;
pub mod error;
pub mod generate;
pub mod layout;
pub mod lenient;
pub mod metrics;
pub mod model;
pub mod money;
pub mod profile;
pub mod rows;
pub mod session;
pub mod store;
pub mod surface;
pub mod table;
pub mod totals;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AppError, Result};
pub use generate::{generate, render_document};
pub use model::{Client, Document, DocumentFlags, DocumentKind, LineItem};
pub use profile::CompanyProfile;
pub use session::DocumentSession;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use totals::Totals;
