//! Listing data structures.

use serde::{Deserialize, Serialize};

/// Raw field extraction for one listing page, as produced by a
/// [`ListingSource`](crate::source::ListingSource).
///
/// Fields may be empty when the page did not expose them; only the
/// label/value arrays carry a consistency requirement, checked by
/// [`Normalizer::normalize`](crate::normalize::Normalizer::normalize).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    /// Canonical URL of the listing page
    pub url: String,

    /// Listing title text
    pub title: String,

    /// View counter text (kept verbatim, e.g. "142")
    pub views: String,

    /// Posting date text, free form
    pub date: String,

    /// Location text (street plus locality)
    pub location: String,

    /// Attribute labels from the details table, in page order
    pub detail_labels: Vec<String>,

    /// Attribute values from the details table, in page order
    pub detail_values: Vec<String>,

    /// Boolean feature tags ("Balkon", "Haustiere erlaubt", ...)
    pub checktags: Vec<String>,

    /// Gallery image URLs, in page order
    pub image_urls: Vec<String>,

    /// Local path of a captured location image, when one was downloaded
    pub local_image: Option<String>,
}

/// A normalized flat listing, immutable after construction and
/// persisted at most once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    /// Deterministic dedup key derived from the title
    pub identity_key: String,

    /// Listing title
    pub title: String,

    /// View counter text
    pub views: String,

    /// Location text
    pub location: String,

    /// Posting date text
    pub date: String,

    /// Feature tags in presentation order
    pub checktags: Vec<String>,

    /// Attribute pairs in extraction order, labels unique
    pub properties: Vec<(String, String)>,

    /// Whether a location image was captured locally
    pub has_location_img: bool,

    /// Gallery image URLs
    pub images: Vec<String>,

    /// Local path of the captured location image, empty if none
    pub local_path: String,

    /// Canonical URL of the listing page
    pub url: String,
}

impl Listing {
    /// Format the listing for announcement using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{location}`, `{date}`, `{views}`, `{url}`
    /// - `{details}`: one `• label: value` line per property
    /// - `{checktags}`: one `• tag ✓` line per feature tag
    pub fn format(&self, template: &str) -> String {
        let details = self
            .properties
            .iter()
            .map(|(label, value)| format!("\t• {label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");

        let checktags = self
            .checktags
            .iter()
            .map(|tag| format!("\t• {tag} ✓"))
            .collect::<Vec<_>>()
            .join("\n");

        template
            .replace("{title}", &self.title)
            .replace("{location}", &self.location)
            .replace("{date}", &self.date)
            .replace("{views}", &self.views)
            .replace("{details}", &details)
            .replace("{checktags}", &checktags)
            .replace("{url}", &self.url)
    }
}
