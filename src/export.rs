//! Export model and job extraction.
//!
//! Only the fields that drive behavior are modeled: card identity, and for each
//! attachment its identity, URL and upload flag. Everything else in the export is
//! ignored by serde.

use crate::error::DocumentError;
use crate::types::DownloadJob;
use crate::utils::is_plain_component;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Parsed board export
#[derive(Clone, Debug, Deserialize)]
pub struct ExportDocument {
    /// Cards in document order
    pub cards: Vec<Card>,
}

/// A card, the unit that owns attachments
#[derive(Clone, Debug, Deserialize)]
pub struct Card {
    /// Card identity, used as the per-card directory name
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    attachments: Option<Vec<Attachment>>,
}

/// A file reference on a card
#[derive(Clone, Debug, Deserialize)]
pub struct Attachment {
    /// Attachment identity
    #[serde(default)]
    pub id: Option<String>,
    /// Where the file lives
    #[serde(default)]
    pub url: Option<String>,
    /// True for uploaded binaries, false for links to external resources
    #[serde(default, rename = "isUpload")]
    pub is_upload: Option<bool>,
}

/// A card or attachment that was dropped because a required field is missing or unusable
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExtractionWarning {
    /// Card without an identity
    #[error("card #{card_index} has no id, skipping its {attachments} attachment(s)")]
    MissingCardId {
        /// Index of the card in the export
        card_index: usize,
        /// Number of attachments dropped with it
        attachments: usize,
    },

    /// Card identity that cannot be used as a single directory name
    #[error("card id {owner_id:?} is not a valid directory name, skipping its attachments")]
    UnusableCardId {
        /// The offending identity
        owner_id: String,
    },

    /// Attachment without one of its required fields
    #[error("attachment #{position} of card {owner_id} has no `{field}`, skipping it")]
    MissingAttachmentField {
        /// Owning card
        owner_id: String,
        /// Index of the attachment within the card
        position: usize,
        /// Attachment identity, when present
        attachment_id: Option<String>,
        /// Name of the missing field as it appears in the export
        field: &'static str,
    },
}

/// Jobs and warnings collected from a whole document
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    /// Jobs in document order
    pub jobs: Vec<DownloadJob>,
    /// Items dropped during extraction
    pub warnings: Vec<ExtractionWarning>,
}

impl ExportDocument {
    /// Parse an export from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        serde_json::from_slice(bytes).map_err(DocumentError::Malformed)
    }

    /// Read and parse an export file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Lazily walk the document, yielding a job per uploaded attachment
    ///
    /// Non-upload attachments are skipped silently. Malformed cards and attachments
    /// come out as `Err(ExtractionWarning)` in place, and iteration carries on.
    /// Calling this again starts over from the first card.
    pub fn jobs(&self) -> Jobs<'_> {
        Jobs {
            cards: self.cards.iter().enumerate(),
            current: None,
        }
    }

    /// Collect every job and warning, logging each warning
    pub fn extract(&self) -> Extraction {
        let mut extraction = Extraction::default();
        for item in self.jobs() {
            match item {
                Ok(job) => extraction.jobs.push(job),
                Err(warning) => {
                    tracing::warn!(warning = %warning, "Skipping malformed export entry");
                    extraction.warnings.push(warning);
                }
            }
        }
        tracing::info!(
            cards = self.cards.len(),
            jobs = extraction.jobs.len(),
            warnings = extraction.warnings.len(),
            "Extracted download jobs"
        );
        extraction
    }
}

impl Card {
    /// Attachments in document order (a missing list counts as empty)
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }

    fn owner_id(&self, card_index: usize) -> Result<&str, ExtractionWarning> {
        match self.id.as_deref() {
            None | Some("") => Err(ExtractionWarning::MissingCardId {
                card_index,
                attachments: self.attachments().len(),
            }),
            Some(id) if !is_plain_component(id) => Err(ExtractionWarning::UnusableCardId {
                owner_id: id.to_string(),
            }),
            Some(id) => Ok(id),
        }
    }
}

impl Attachment {
    /// `None` for link-only attachments, otherwise a job or a warning
    fn to_job(
        &self,
        owner_id: &str,
        position: usize,
    ) -> Option<Result<DownloadJob, ExtractionWarning>> {
        let missing = |field: &'static str| ExtractionWarning::MissingAttachmentField {
            owner_id: owner_id.to_string(),
            position,
            attachment_id: self.id.clone().filter(|id| !id.is_empty()),
            field,
        };

        match self.is_upload {
            None => return Some(Err(missing("isUpload"))),
            Some(false) => return None,
            Some(true) => {}
        }

        let attachment_id = match self.id.as_deref() {
            None | Some("") => return Some(Err(missing("id"))),
            Some(id) => id,
        };
        let source_url = match self.url.as_deref() {
            None | Some("") => return Some(Err(missing("url"))),
            Some(url) => url,
        };

        Some(Ok(DownloadJob {
            owner_id: owner_id.to_string(),
            attachment_id: attachment_id.to_string(),
            position,
            source_url: source_url.to_string(),
        }))
    }
}

/// Iterator returned by [`ExportDocument::jobs`]
pub struct Jobs<'a> {
    cards: std::iter::Enumerate<std::slice::Iter<'a, Card>>,
    current: Option<(&'a str, std::iter::Enumerate<std::slice::Iter<'a, Attachment>>)>,
}

impl<'a> Iterator for Jobs<'a> {
    type Item = Result<DownloadJob, ExtractionWarning>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((owner_id, attachments)) = &mut self.current {
                let owner_id: &'a str = *owner_id;
                for (position, attachment) in attachments.by_ref() {
                    if let Some(item) = attachment.to_job(owner_id, position) {
                        return Some(item);
                    }
                }
                self.current = None;
            }

            let (card_index, card) = self.cards.next()?;
            match card.owner_id(card_index) {
                Ok(owner_id) => {
                    self.current = Some((owner_id, card.attachments().iter().enumerate()));
                }
                Err(warning) => return Some(Err(warning)),
            }
        }
    }
}
