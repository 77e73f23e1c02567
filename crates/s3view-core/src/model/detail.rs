// ── Detail domain types ──

use chrono::{DateTime, Utc};
use s3view_api::{GeonamesObject, LocalizationCorner};
use serde::{Deserialize, Serialize};
use url::Url;

use super::summary::{Features, Summary};

/// Which file listing a link came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum LinkKind {
    Additional,
    Target,
    FullProduct,
}

/// A browsable file attached to an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    pub file_name: String,
    pub url: Url,
}

/// Hydrated record for one image: the authoritative summary plus every
/// facet, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub summary: Summary,
    pub geonames: Vec<GeonamesObject>,
    pub localization: Option<LocalizationCorner>,
    pub features: Option<Features>,
    pub links: Vec<Link>,
    /// Human-readable modification time.
    pub display_modified: String,
    pub fetched_at: DateTime<Utc>,
}

impl Detail {
    /// Flattened place names, most specific last within each country.
    pub fn place_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for country in &self.geonames {
            names.push(country.name.clone());
            for state in &country.states {
                names.push(state.name.clone());
                for county in &state.counties {
                    names.push(county.name.clone());
                    names.extend(county.cities.iter().map(|c| c.name.clone()));
                    names.extend(county.villages.iter().map(|v| v.name.clone()));
                }
            }
        }
        names.retain(|n| !n.is_empty());
        names
    }

    pub fn links_of(&self, kind: LinkKind) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |l| l.kind == kind)
    }
}
