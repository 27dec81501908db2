//! # Solr Index Adapter
//!
//! [`IndexRepository`] over the Solr HTTP API.
//!
//! - search: `GET {url}/{core}/select` with `q=*:*` and one `fq` per clause
//! - add/overwrite and delete: `POST {url}/{core}/update?commit=true`
//!
//! Documents in a select response are decoded field by field through
//! [`FieldValue`], so one malformed field never fails a whole search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::IndexRepository;
use crate::core::error::{SearchError, SearchResult};
use crate::core::types::ProductDocument;
use crate::search::{SearchFilters, SearchPage};

/// Solr connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    /// Base URL of the Solr server, without the core
    pub url: String,

    /// Core (collection) holding product documents
    pub core: String,

    /// Timeout for a single request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Sort clause applied to every search
    pub default_sort: String,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8983/solr".to_string(),
            core: "products-core".to_string(),
            timeout: Duration::from_secs(8),
            default_sort: "updated_at desc".to_string(),
        }
    }
}

/// Characters with a meaning in the Lucene query syntax
const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Escape a term so Solr matches it literally
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query string parameters of a select request
pub fn build_query_params(filters: &SearchFilters, sort: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![("wt", "json".to_string()), ("q", "*:*".to_string())];

    if !filters.query.is_empty() {
        let term = escape_term(&filters.query);
        params.push((
            "fq",
            format!("(name:*{term}* OR descripcion:*{term}*)", term = term),
        ));
    }

    let facets = [
        ("tipo", &filters.product_type),
        ("estacion", &filters.season),
        ("ocasion", &filters.occasion),
        ("genero", &filters.gender),
        ("marca", &filters.brand),
    ];
    for (field, value) in facets {
        if !value.is_empty() {
            params.push(("fq", format!("{}:{}", field, escape_term(value))));
        }
    }

    params.push(("start", filters.offset().to_string()));
    params.push(("rows", filters.size.to_string()));
    if !sort.is_empty() {
        params.push(("sort", sort.to_string()));
    }
    params
}

/// Shape of one field in a Solr document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Absent or `null`
    Missing,
    Scalar(&'a Value),
    List(&'a [Value]),
}

impl<'a> FieldValue<'a> {
    /// Classify a field of a document
    pub fn of(doc: &'a Map<String, Value>, field: &str) -> Self {
        match doc.get(field) {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(values)) => Self::List(values),
            Some(value) => Self::Scalar(value),
        }
    }

    /// The first available scalar
    pub fn first(&self) -> Option<&'a Value> {
        match *self {
            Self::Missing => None,
            Self::Scalar(value) => Some(value),
            Self::List(values) => values.iter().find(|v| is_scalar(v)),
        }
    }

    pub fn as_string(&self) -> String {
        match self.first() {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.first() {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self.first() {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        }
    }

    /// RFC 3339 timestamp; the Unix epoch when absent or unparsable
    pub fn as_datetime(&self) -> DateTime<Utc> {
        match self.first() {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default(),
            _ => DateTime::<Utc>::default(),
        }
    }

    /// Every scalar as a string; a single scalar becomes a one-element list
    pub fn as_string_list(&self) -> Vec<String> {
        match *self {
            Self::Missing => Vec::new(),
            Self::Scalar(_) => vec![self.as_string()],
            Self::List(values) => values
                .iter()
                .filter(|v| is_scalar(v))
                .map(|v| FieldValue::Scalar(v).as_string())
                .collect(),
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Build a product from a raw Solr document
pub fn decode_document(doc: &Map<String, Value>) -> ProductDocument {
    let field = |name: &str| FieldValue::of(doc, name);

    ProductDocument {
        id: field("id").as_string(),
        name: field("name").as_string(),
        description: field("descripcion").as_string(),
        price: field("precio").as_f64(),
        stock: field("stock").as_i64(),
        product_type: field("tipo").as_string(),
        season: field("estacion").as_string(),
        occasion: field("ocasion").as_string(),
        gender: field("genero").as_string(),
        brand: field("marca").as_string(),
        tags: field("notas").as_string_list(),
        created_at: field("created_at").as_datetime(),
        updated_at: field("updated_at").as_datetime(),
    }
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    #[serde(rename = "numFound")]
    num_found: i64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

/// Solr HTTP client
pub struct SolrClient {
    client: Client,
    base_url: String,
    core: String,
    sort: String,
}

impl SolrClient {
    pub fn new(config: &SolrConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::config(format!("Failed to create Solr HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            core: config.core.clone(),
            sort: config.default_sort.clone(),
        })
    }

    fn endpoint(&self, handler: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.core, handler)
    }

    async fn post_update(&self, payload: Value) -> SearchResult<()> {
        let response = self
            .client
            .post(self.endpoint("update"))
            .query(&[("commit", "true")])
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::index(format!("Solr update request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Solr update rejected");
            return Err(SearchError::index(format!(
                "Solr update returned status {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IndexRepository for SolrClient {
    async fn search(&self, filters: &SearchFilters) -> SearchResult<SearchPage> {
        let params = build_query_params(filters, &self.sort);
        let started = Instant::now();

        let response = self
            .client
            .get(self.endpoint("select"))
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::backend(format!("Solr request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::backend(format!(
                "Solr returned status {}",
                status.as_u16()
            )));
        }

        let body: SelectResponse = response
            .json()
            .await
            .map_err(|e| SearchError::backend(format!("Failed to decode Solr response: {}", e)))?;

        debug!(
            num_found = body.response.num_found,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Solr select completed"
        );

        Ok(SearchPage {
            items: body.response.docs.iter().map(decode_document).collect(),
            page: filters.page,
            size: filters.size,
            total: body.response.num_found,
        })
    }

    async fn index_product(&self, product: &ProductDocument) -> SearchResult<()> {
        let payload = json!({
            "add": {
                "doc": product,
                "overwrite": true,
            }
        });
        self.post_update(payload).await
    }

    async fn delete_product(&self, id: &str) -> SearchResult<()> {
        self.post_update(json!({ "delete": { "id": id } })).await
    }
}
