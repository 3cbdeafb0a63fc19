// ============================================================================
// PDF Generation
// ============================================================================

use crate::clock::Clock;
use crate::error::Result;
use crate::layout::{self, LayoutInput, LayoutReport};
use crate::model::{Document, DocumentKind};
use crate::profile::CompanyProfile;
use crate::rows::build_rows;
use crate::store::{self, KeyValueStore};
use crate::surface::{DrawingSurface, PdfSurface};
use crate::totals::Totals;
use ::image::DynamicImage;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Render `document` onto any surface. The document is not modified; an
/// empty item list is drawn with a blank placeholder row.
pub fn render_document(
    surface: &mut dyn DrawingSurface,
    document: &Document,
    profile: &CompanyProfile,
    logo: Option<&DynamicImage>,
    now: NaiveDateTime,
) -> Result<LayoutReport> {
    let mut document = document.clone();
    document.ensure_renderable();

    for issue in document.validate() {
        log::warn!("{} {}: {}", document.kind, document.id, issue);
    }

    let totals = Totals::compute(&document);
    let rows = build_rows(document.kind, &document.items, &profile.unit_label);
    let input = LayoutInput {
        document: &document,
        totals: &totals,
        rows: &rows,
        profile,
        logo,
        now,
    };
    layout::render(surface, &input)
}

/// Load the stored form for `kind`, lay it out and write
/// `devis.pdf`/`facture.pdf` into `output_dir`. Returns the written path.
pub fn generate<S: KeyValueStore + ?Sized>(
    store: &S,
    kind: DocumentKind,
    profile: &CompanyProfile,
    logo: Option<&DynamicImage>,
    clock: &dyn Clock,
    output_dir: &Path,
) -> Result<PathBuf> {
    let document = store::load(store, kind, clock);
    let now = clock.now();

    let mut surface = PdfSurface::a4(kind.title())?;
    let report = render_document(&mut surface, &document, profile, logo, now)?;
    log::info!(
        "{} {} laid out on {} page(s)",
        kind,
        report.document_number,
        report.pages
    );

    if !output_dir.as_os_str().is_empty() {
        fs::create_dir_all(output_dir)?;
    }
    let path = output_dir.join(kind.file_name());
    surface.save(&path)?;
    Ok(path)
}
