//! Search filters: defaults, normalization, validation and cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::error::{SearchError, SearchResult};

/// Page used when the caller leaves it unset
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when the caller leaves it unset
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size accepted
pub const MAX_PAGE_SIZE: i64 = 100;

/// Bounds on the free-text term, in characters
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 200;

/// Prefix of every search result cache key
pub const CACHE_KEY_PREFIX: &str = "search:";

/// Query parameters of a product search.
///
/// `page` and `size` are signed so that out-of-range input coming from an
/// outer surface reaches validation instead of being lost in parsing. Zero
/// means "unset" and is replaced by the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Free-text term matched against name and description
    #[serde(rename = "q")]
    pub query: String,

    #[serde(rename = "tipo")]
    pub product_type: String,

    #[serde(rename = "estacion")]
    pub season: String,

    #[serde(rename = "ocasion")]
    pub occasion: String,

    #[serde(rename = "genero")]
    pub gender: String,

    #[serde(rename = "marca")]
    pub brand: String,

    pub page: i64,

    pub size: i64,
}

impl SearchFilters {
    /// Filters for a free-text query on the first page
    pub fn query<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Fill unset paging values
    pub fn apply_defaults(mut self) -> Self {
        if self.page == 0 {
            self.page = DEFAULT_PAGE;
        }
        if self.size == 0 {
            self.size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    /// Trim the text and trim + lower-case every facet
    pub fn normalize(mut self) -> Self {
        self.query = self.query.trim().to_string();
        for facet in [
            &mut self.product_type,
            &mut self.season,
            &mut self.occasion,
            &mut self.gender,
            &mut self.brand,
        ] {
            *facet = facet.trim().to_lowercase();
        }
        self
    }

    /// Check bounds; values out of range are rejected, never clamped
    pub fn validate(&self) -> SearchResult<()> {
        if !self.query.is_empty() {
            let chars = self.query.chars().count();
            if chars < MIN_QUERY_CHARS {
                return Err(SearchError::validation(format!(
                    "q must have at least {} characters",
                    MIN_QUERY_CHARS
                )));
            }
            if chars > MAX_QUERY_CHARS {
                return Err(SearchError::validation(format!(
                    "q must have {} characters or fewer",
                    MAX_QUERY_CHARS
                )));
            }
        }
        if self.page < 1 {
            return Err(SearchError::validation(
                "page must be greater or equal to 1",
            ));
        }
        if self.size < 1 || self.size > MAX_PAGE_SIZE {
            return Err(SearchError::validation(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Apply defaults, normalize and validate in one step
    pub fn prepare(self) -> SearchResult<Self> {
        let filters = self.apply_defaults().normalize();
        filters.validate()?;
        Ok(filters)
    }

    /// Deterministic cache key of the filter tuple.
    ///
    /// Only meaningful on normalized filters; equivalent inputs then hash to
    /// the same key.
    pub fn cache_key(&self) -> String {
        let raw = format!(
            "q={}|type={}|season={}|occasion={}|gender={}|brand={}|page={}|size={}",
            self.query,
            self.product_type,
            self.season,
            self.occasion,
            self.gender,
            self.brand,
            self.page,
            self.size
        );

        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        format!("{}{}", CACHE_KEY_PREFIX, hex::encode(hasher.finalize()))
    }

    /// Zero-based offset of the first document on the requested page
    ///
    /// Saturates at `i64::MAX` for pages beyond any realistic result set.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size).max(0)
    }
}
