//! Export documents and served file content

use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// One attachment entry as it appears in an export
pub struct AttachmentSpec<'a> {
    pub id: &'a str,
    pub url: String,
    pub is_upload: bool,
}

pub fn upload<'a>(id: &'a str, url: String) -> AttachmentSpec<'a> {
    AttachmentSpec {
        id,
        url,
        is_upload: true,
    }
}

pub fn link<'a>(id: &'a str, url: String) -> AttachmentSpec<'a> {
    AttachmentSpec {
        id,
        url,
        is_upload: false,
    }
}

/// Build an export with the given cards, padded with the noise real exports carry
pub fn export_json(cards: Vec<(&str, Vec<AttachmentSpec<'_>>)>) -> Value {
    let cards: Vec<Value> = cards
        .into_iter()
        .map(|(id, attachments)| {
            let attachments: Vec<Value> = attachments
                .into_iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "url": a.url,
                        "isUpload": a.is_upload,
                        "bytes": 1024,
                        "mimeType": "application/octet-stream",
                    })
                })
                .collect();
            json!({
                "id": id,
                "name": format!("Card {id}"),
                "closed": false,
                "labels": [],
                "attachments": attachments,
            })
        })
        .collect();

    json!({
        "id": "board1",
        "name": "Test board",
        "lists": [{ "id": "l1", "name": "Todo" }],
        "cards": cards,
    })
}

/// Write an export next to where the default output root would be
pub fn write_export(dir: &Path, export: &Value) -> PathBuf {
    let path = dir.join("board.json");
    std::fs::write(&path, serde_json::to_vec_pretty(export).unwrap()).unwrap();
    path
}

/// Deterministic binary content of the given size
pub fn file_content(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
