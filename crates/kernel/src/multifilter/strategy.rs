//! Pluggable rendering strategies.
//!
//! The renderer receives a [`PlaceholderImage`] and an [`ExcerptFormatter`]
//! at construction. Both have defaults; sites override them to change the
//! fallback image source or the excerpt algorithm.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use super::html;
use crate::content::ContentItem;

/// Size key used when a requested key is unknown.
pub const FALLBACK_SIZE: &str = "large";

/// Dimensions used when neither the key nor the fallback is registered.
const FALLBACK_DIMENSIONS: (u32, u32) = (1024, 1024);

/// Registry of named image sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSizes(BTreeMap<String, (u32, u32)>);

impl Default for ImageSizes {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("thumbnail".to_string(), (150, 150)),
            ("medium".to_string(), (300, 300)),
            ("large".to_string(), (1024, 1024)),
        ]))
    }
}

impl ImageSizes {
    /// Parse `name=WxH` pairs separated by commas.
    pub fn parse(value: &str) -> Result<Self> {
        let mut sizes = BTreeMap::new();
        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((name, dims)) = entry.split_once('=') else {
                bail!("image size entry {entry:?} is not name=WxH");
            };
            let Some((w, h)) = dims.split_once('x') else {
                bail!("image size {name:?} is not WxH");
            };
            let width: u32 = w
                .trim()
                .parse()
                .with_context(|| format!("invalid width for image size {name:?}"))?;
            let height: u32 = h
                .trim()
                .parse()
                .with_context(|| format!("invalid height for image size {name:?}"))?;
            sizes.insert(name.trim().to_string(), (width, height));
        }
        if sizes.is_empty() {
            bail!("no image sizes configured");
        }
        Ok(Self(sizes))
    }

    /// Dimensions for a size key, falling back to `large`.
    pub fn dimensions(&self, key: &str) -> (u32, u32) {
        self.0
            .get(key)
            .or_else(|| self.0.get(FALLBACK_SIZE))
            .copied()
            .unwrap_or(FALLBACK_DIMENSIONS)
    }
}

/// Produces an image URL for items without a stored thumbnail.
pub trait PlaceholderImage: Send + Sync {
    fn url(&self, size_key: &str, width: u32, height: u32) -> String;
}

/// Grey placeholder from dummyimage.com.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyImagePlaceholder;

impl PlaceholderImage for DummyImagePlaceholder {
    fn url(&self, _size_key: &str, width: u32, height: u32) -> String {
        format!("https://dummyimage.com/{width}x{height}/cccccc/fff.jpg")
    }
}

/// Excerpt produced for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    /// HTML-safe text.
    pub html: String,
    /// Words were cut; the "more" marker applies.
    pub truncated: bool,
}

/// Builds item excerpts. The length is always passed in, never read from
/// shared state, so concurrent renders cannot interfere.
pub trait ExcerptFormatter: Send + Sync {
    fn excerpt(&self, item: &ContentItem, length: u32) -> Excerpt;
}

/// Word-count excerpts from the hand-written excerpt or the stripped body.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordExcerpt;

impl ExcerptFormatter for WordExcerpt {
    fn excerpt(&self, item: &ContentItem, length: u32) -> Excerpt {
        if let Some(manual) = item.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
            return Excerpt {
                html: html::escape(manual.trim()),
                truncated: false,
            };
        }

        let text = html::strip_tags(&item.body);
        let words: Vec<&str> = text.split_whitespace().collect();
        let length = length as usize;
        if words.len() > length {
            Excerpt {
                html: words[..length].join(" "),
                truncated: true,
            }
        } else {
            Excerpt {
                html: words.join(" "),
                truncated: false,
            }
        }
    }
}
