//! Turns an uploaded garment photo into a transport-safe payload.
//!
//! Every encoded asset carries a [`PreviewHandle`] allocated from a
//! [`PreviewRegistry`]. Handles release themselves when dropped, so replacing a
//! [`GarmentAsset`] frees the previous preview exactly once.

use crate::error::{Result, StudioError};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

#[derive(Debug, Default)]
struct RegistryState {
    live: HashSet<Uuid>,
    allocated: u64,
    released: u64,
    stray_releases: u64,
}

/// Tracks preview handles so leaks and double releases are observable.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, content_type: &str, len: usize) -> PreviewHandle {
        let id = Uuid::new_v4();
        if let Ok(mut state) = self.state.lock() {
            state.live.insert(id);
            state.allocated += 1;
        }
        log::debug!("Allocated preview {} ({}, {} bytes)", id, content_type, len);
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    fn release(&self, id: Uuid) {
        if let Ok(mut state) = self.state.lock() {
            if state.live.remove(&id) {
                state.released += 1;
                log::debug!("Released preview {}", id);
            } else {
                state.stray_releases += 1;
                log::warn!("Preview {} released twice", id);
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().map(|state| state.live.len()).unwrap_or(0)
    }

    pub fn released_count(&self) -> u64 {
        self.state.lock().map(|state| state.released).unwrap_or(0)
    }

    pub fn allocated_count(&self) -> u64 {
        self.state.lock().map(|state| state.allocated).unwrap_or(0)
    }

    pub fn stray_release_count(&self) -> u64 {
        self.state.lock().map(|state| state.stray_releases).unwrap_or(0)
    }
}

/// Displayable preview of an uploaded garment. Released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// The uploaded garment, owned by the studio session for its lifetime.
#[derive(Debug)]
pub struct GarmentAsset {
    pub file_name: Option<String>,
    pub raw: Vec<u8>,
    pub preview: PreviewHandle,
    pub encoded_data: String,
    pub content_type: String,
}

/// Sniffs PNG, JPEG or WEBP from the leading bytes.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn content_type_from_name(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Encodes an in-memory upload.
pub fn encode_bytes(
    bytes: Vec<u8>,
    file_name: Option<&str>,
    registry: &PreviewRegistry,
) -> Result<GarmentAsset> {
    if bytes.is_empty() {
        return Err(StudioError::Encoding("uploaded file is empty".into()));
    }

    let content_type = sniff_content_type(&bytes)
        .or_else(|| file_name.and_then(content_type_from_name))
        .ok_or_else(|| {
            StudioError::Encoding(format!(
                "unsupported image type for {}; expected one of {}",
                file_name.unwrap_or("upload"),
                ACCEPTED_CONTENT_TYPES.join(", ")
            ))
        })?;

    let encoded_data = STANDARD.encode(&bytes);
    let preview = registry.allocate(content_type, bytes.len());

    Ok(GarmentAsset {
        file_name: file_name.map(String::from),
        raw: bytes,
        preview,
        encoded_data,
        content_type: content_type.to_string(),
    })
}

/// Reads and encodes an upload from disk.
pub async fn encode_file(path: impl AsRef<Path>, registry: &PreviewRegistry) -> Result<GarmentAsset> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        StudioError::Encoding(format!("failed to read {}: {}", path.display(), e))
    })?;
    let file_name = path.file_name().and_then(|name| name.to_str());
    encode_bytes(bytes, file_name, registry)
}
