// ============================================================================
// Company Profile
// ============================================================================

use crate::error::{AppError, Result};
use crate::model::DocumentKind;
use ::image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Profile written on first use when none exists yet.
pub const DEFAULT_PROFILE: &str = include_str!("../company.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureLabels {
    pub quote: String,
    pub invoice: String,
}

impl Default for SignatureLabels {
    fn default() -> Self {
        SignatureLabels {
            quote: "Bon pour accord".to_string(),
            invoice: "Signature".to_string(),
        }
    }
}

/// Static identity of the issuing company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub siret: String,
    #[serde(default)]
    pub ape: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default = "default_unit_label")]
    pub unit_label: String,
    #[serde(default)]
    pub payment_terms: Vec<String>,
    #[serde(default)]
    pub signature: SignatureLabels,
}

fn default_unit_label() -> String {
    "u".to_string()
}

impl CompanyProfile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::Profile(e.to_string()))
    }

    /// The embedded default profile.
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_PROFILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Profile(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content).map_err(|e| AppError::Profile(format!("{}: {}", path.display(), e)))
    }

    /// Load `path`, writing the default profile there first if it is missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("writing default company profile to {}", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_PROFILE)?;
        }
        Self::load(path)
    }

    /// Header lines under the logo, in print order. Empty fields are skipped.
    pub fn identity_lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.clone()];
        if !self.address.is_empty() {
            lines.push(self.address.clone());
        }
        if !self.phone.is_empty() {
            lines.push(format!("Téléphone : {}", self.phone));
        }
        if !self.email.is_empty() {
            lines.push(format!("Email : {}", self.email));
        }
        if !self.siret.is_empty() {
            lines.push(format!("SIRET : {}", self.siret));
        }
        if !self.ape.is_empty() {
            lines.push(format!("Code APE : {}", self.ape));
        }
        lines
    }

    pub fn signature_label(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Quote => &self.signature.quote,
            DocumentKind::Invoice => &self.signature.invoice,
        }
    }
}

/// Load the logo from a file path or an http(s) URL.
pub fn load_logo(source: Option<&str>) -> Result<Option<DynamicImage>> {
    match source {
        Some(p) => {
            let image_bytes = if p.starts_with("http://") || p.starts_with("https://") {
                let response = ureq::get(p)
                    .call()
                    .map_err(|e| AppError::Logo(format!("Failed to fetch URL: {}", e)))?;

                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| AppError::Logo(format!("Failed to read response: {}", e)))?;
                bytes
            } else {
                fs::read(p).map_err(|e| AppError::Logo(format!("{}: {}", p, e)))?
            };

            let img = ::image::load_from_memory(&image_bytes)
                .map_err(|e| AppError::Logo(format!("Failed to decode image: {}", e)))?;

            Ok(Some(img))
        }
        None => Ok(None),
    }
}
