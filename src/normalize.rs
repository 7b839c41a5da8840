// src/normalize.rs

//! Listing normalization and identity key derivation.
//!
//! Turns a [`RawListing`] into a canonical [`Listing`] and derives the
//! deterministic key the store deduplicates on. Pure transformation,
//! no I/O.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{IdentityConfig, Listing, RawListing};

/// Characters left unescaped by JavaScript's `encodeURI`, which the
/// stored keys were originally derived with.
const ENCODE_URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#');

/// Percent-encode a title with `encodeURI` semantics.
pub fn encoded_title(title: &str) -> String {
    utf8_percent_encode(title, ENCODE_URI).to_string()
}

/// Strategy for deriving a listing's identity key.
///
/// The store's contract only requires determinism and a bounded length,
/// so stronger keys can be swapped in without touching persistence.
pub trait KeyStrategy: Send + Sync {
    fn derive(&self, raw: &RawListing) -> String;
}

/// Default strategy: percent-encoded title truncated to the
/// unique-index width limit. Distinct listings sharing a title collide;
/// accepted trade-off inherited from the stored data.
pub struct EncodedTitleKey {
    max_len: usize,
}

impl EncodedTitleKey {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl KeyStrategy for EncodedTitleKey {
    fn derive(&self, raw: &RawListing) -> String {
        let mut key = encoded_title(&raw.title);
        // Encoded output is ASCII, so byte truncation is char-safe.
        key.truncate(self.max_len);
        key
    }
}

/// Collision-resistant alternative: hex SHA-256 over title, location
/// and date.
pub struct Sha256Key;

impl KeyStrategy for Sha256Key {
    fn derive(&self, raw: &RawListing) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw.title.as_bytes());
        hasher.update(b"\n");
        hasher.update(raw.location.as_bytes());
        hasher.update(b"\n");
        hasher.update(raw.date.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Normalizes raw extractions into canonical listings.
pub struct Normalizer {
    key: Box<dyn KeyStrategy>,
}

impl Normalizer {
    /// Create a normalizer with an explicit key strategy.
    pub fn new(key: Box<dyn KeyStrategy>) -> Self {
        Self { key }
    }

    /// Create a normalizer from configuration.
    pub fn from_config(config: &IdentityConfig) -> Self {
        let key: Box<dyn KeyStrategy> = match config.strategy.as_str() {
            "sha256" => Box::new(Sha256Key),
            "encoded-title" => Box::new(EncodedTitleKey::new(config.max_key_len)),
            other => {
                log::warn!("Unknown identity strategy '{other}', using encoded-title");
                Box::new(EncodedTitleKey::new(config.max_key_len))
            }
        };
        Self::new(key)
    }

    /// Normalize a raw extraction into a [`Listing`].
    ///
    /// Fails with [`AppError::Malformed`] when the detail label and
    /// value counts disagree; the caller must skip the listing without
    /// persisting or announcing it.
    pub fn normalize(&self, raw: &RawListing) -> Result<Listing> {
        if raw.detail_labels.len() != raw.detail_values.len() {
            return Err(AppError::Malformed {
                title: raw.title.clone(),
                labels: raw.detail_labels.len(),
                values: raw.detail_values.len(),
            });
        }

        // Zip labels with values in page order; a repeated label
        // overwrites the earlier value (last-write-wins) but keeps its
        // original position.
        let mut properties: Vec<(String, String)> = Vec::with_capacity(raw.detail_labels.len());
        for (label, value) in raw.detail_labels.iter().zip(&raw.detail_values) {
            match properties.iter_mut().find(|(l, _)| l == label) {
                Some((_, v)) => *v = value.clone(),
                None => properties.push((label.clone(), value.clone())),
            }
        }

        Ok(Listing {
            identity_key: self.key.derive(raw),
            title: raw.title.clone(),
            views: raw.views.clone(),
            location: raw.location.clone(),
            date: raw.date.clone(),
            checktags: raw.checktags.clone(),
            properties,
            has_location_img: raw.local_image.is_some(),
            images: raw.image_urls.clone(),
            local_path: raw.local_image.clone().unwrap_or_default(),
            url: raw.url.clone(),
        })
    }
}
