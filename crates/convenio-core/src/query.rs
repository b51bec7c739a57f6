//! # List Queries
//!
//! Turns raw list-view query parameters into a normalized, allowlisted
//! [`ListParams`] and computes pagination.
//!
//! ## Normalization Pipeline
//! ```text
//! ?search= Ana &status=cancelado&sort=-balance_cents&per_page=abc&page=9999
//!      │
//!      ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ ListParams::resolve(request, spec, sizing)                           │
//! │   search   → "Ana"            (trimmed, empty → none, capped)        │
//! │   status   → cancelled = true (unknown values → no filter)           │
//! │   sort     → balance_cents ↓  (not in allowlist → entity default)    │
//! │   per_page → 10               (unparseable → default, clamped)       │
//! └──────────────────────────────────────────────────────────────────────┘
//!      │   COUNT(*) with the same filters
//!      ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ Paginator::new(total, per_page).clamp("9999") → last page           │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here ever fails: a list request always yields a page.

use serde::{Deserialize, Serialize};

use crate::validation::normalize_search_query;

/// Page size when none (or garbage) is requested.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Upper bound for a requested page size.
pub const MAX_PER_PAGE: u32 = 100;

// =============================================================================
// Request
// =============================================================================

/// Raw list parameters exactly as they arrive on the query string.
///
/// Every field is text so that malformed numbers reach the clamping logic
/// instead of being rejected by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    /// Alias of `sort_by`; a leading `-` means descending
    pub sort: Option<String>,
    pub order: Option<String>,
    pub per_page: Option<String>,
    pub page: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub const fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

// =============================================================================
// Per-entity list specification
// =============================================================================

/// How the `status` query parameter maps onto a column.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusFilter {
    /// The entity has no status filter.
    None,

    /// A boolean column; each listed word selects `true` or `false`.
    Flag {
        column: &'static str,
        true_values: &'static [&'static str],
        false_values: &'static [&'static str],
    },

    /// A coded column; `(accepted word, stored code)` pairs.
    Code {
        column: &'static str,
        values: &'static [(&'static str, &'static str)],
    },
}

/// A resolved status condition, ready to become a WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCondition {
    Flag { column: &'static str, value: bool },
    Code { column: &'static str, value: &'static str },
}

impl StatusFilter {
    /// Resolves a raw status word. Unknown words (including "all") filter nothing.
    pub fn resolve(&self, raw: &str) -> Option<StatusCondition> {
        let word = raw.trim();
        if word.is_empty() {
            return None;
        }
        match *self {
            StatusFilter::None => None,
            StatusFilter::Flag {
                column,
                true_values,
                false_values,
            } => {
                if true_values.iter().any(|v| v.eq_ignore_ascii_case(word)) {
                    Some(StatusCondition::Flag { column, value: true })
                } else if false_values.iter().any(|v| v.eq_ignore_ascii_case(word)) {
                    Some(StatusCondition::Flag { column, value: false })
                } else {
                    None
                }
            }
            StatusFilter::Code { column, values } => values
                .iter()
                .find(|(accepted, _)| accepted.eq_ignore_ascii_case(word))
                .map(|(_, code)| StatusCondition::Code { column, value: code }),
        }
    }
}

/// Search, status and sort allowlists of one entity.
///
/// Column names refer to the entity's list projection; they are the only
/// identifiers ever interpolated into SQL.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ListSpec {
    pub search_fields: &'static [&'static str],
    pub sort_fields: &'static [&'static str],
    pub default_sort: &'static str,
    pub default_order: SortOrder,
    pub status: StatusFilter,
}

// =============================================================================
// Resolved parameters
// =============================================================================

/// Page-size policy (from configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizing {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PageSizing {
    fn default() -> Self {
        PageSizing {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

/// Effective list parameters after allowlisting and clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<StatusCondition>,
    /// The raw status word, echoed back only when it selected a filter
    pub status_word: Option<String>,
    pub sort_by: &'static str,
    pub order: SortOrder,
    pub per_page: u32,
    /// Requested page, still raw; clamped once the total is known
    pub page: Option<String>,
}

impl ListParams {
    /// Normalizes a raw request against an entity's allowlists.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::query::{ListParams, ListRequest, PageSizing, SortOrder};
    /// use convenio_core::schema;
    ///
    /// let request = ListRequest {
    ///     sort: Some("-balance_cents".into()),
    ///     per_page: Some("abc".into()),
    ///     ..Default::default()
    /// };
    /// let params = ListParams::resolve(&request, &schema::CLIENT.list, PageSizing::default());
    /// assert_eq!(params.sort_by, "balance_cents");
    /// assert_eq!(params.order, SortOrder::Desc);
    /// assert_eq!(params.per_page, 10);
    /// ```
    pub fn resolve(request: &ListRequest, spec: &ListSpec, sizing: PageSizing) -> Self {
        let search = request.search.as_deref().and_then(normalize_search_query);

        let (status, status_word) = match request.status.as_deref() {
            Some(word) => match spec.status.resolve(word) {
                Some(condition) => (Some(condition), Some(word.trim().to_string())),
                None => (None, None),
            },
            None => (None, None),
        };

        let explicit_order = request.order.as_deref().and_then(SortOrder::parse);
        let requested = request
            .sort_by
            .as_deref()
            .or(request.sort.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (sort_by, order) = match requested {
            Some(raw) => {
                let (descending, field) = match raw.strip_prefix('-') {
                    Some(field) => (true, field),
                    None => (false, raw),
                };
                match spec.sort_fields.iter().find(|f| **f == field) {
                    Some(allowed) => {
                        let order = if descending {
                            SortOrder::Desc
                        } else {
                            explicit_order.unwrap_or(SortOrder::Asc)
                        };
                        (*allowed, order)
                    }
                    None => (spec.default_sort, explicit_order.unwrap_or(spec.default_order)),
                }
            }
            None => (spec.default_sort, explicit_order.unwrap_or(spec.default_order)),
        };

        let per_page = request
            .per_page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(sizing.default_per_page)
            .min(sizing.max_per_page);

        ListParams {
            search,
            status,
            status_word,
            sort_by,
            order,
            per_page,
            page: request.page.clone(),
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Page arithmetic for a known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    per_page: u32,
}

impl Paginator {
    pub fn new(total: u64, per_page: u32) -> Self {
        Paginator {
            total,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty collection still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page));
        pages.clamp(1, u64::from(u32::MAX)) as u32
    }

    /// Clamps a raw page request.
    ///
    /// ```text
    /// missing / "" / "abc" / "2.5"  → 1
    /// "0", "-3"                     → 1
    /// beyond the last page          → last page
    /// ```
    pub fn clamp(&self, raw: Option<&str>) -> u32 {
        let last = self.total_pages();
        match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 => 1,
            Some(n) if n > i64::from(last) => last,
            Some(n) => n as u32,
        }
    }

    /// Row offset of a (clamped) page.
    pub fn offset(&self, page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

/// The effective search/sort/filter state, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: String,
    pub order: SortOrder,
}

/// One page of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
    pub filters: AppliedFilters,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: &ListParams, paginator: Paginator, page: u32) -> Self {
        let total_pages = paginator.total_pages();
        Page {
            items,
            pagination: PageMeta {
                page,
                per_page: paginator.per_page(),
                total: paginator.total(),
                total_pages,
                has_previous: page > 1,
                has_next: page < total_pages,
            },
            filters: AppliedFilters {
                search: params.search.clone(),
                status: params.status_word.clone(),
                sort_by: params.sort_by.to_string(),
                order: params.order,
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
            filters: self.filters,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn request() -> ListRequest {
        ListRequest::default()
    }

    #[test]
    fn test_page_clamping() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.total_pages(), 3);
        assert_eq!(paginator.clamp(Some("9999")), 3);
        assert_eq!(paginator.clamp(Some("abc")), 1);
        assert_eq!(paginator.clamp(Some("2.5")), 1);
        assert_eq!(paginator.clamp(Some("0")), 1);
        assert_eq!(paginator.clamp(Some(" 2 ")), 2);
        assert_eq!(paginator.clamp(None), 1);
        assert_eq!(paginator.offset(3), 20);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.total_pages(), 1);
        assert_eq!(paginator.clamp(Some("5")), 1);
    }

    #[test]
    fn test_unknown_sort_falls_back_to_default() {
        let mut req = request();
        req.sort_by = Some("password_hash".into());
        let params = ListParams::resolve(&req, &schema::CLIENT.list, PageSizing::default());
        assert_eq!(params.sort_by, "full_name");
        assert_eq!(params.order, SortOrder::Asc);
    }

    #[test]
    fn test_sort_direction() {
        let mut req = request();
        req.sort = Some("city".into());
        req.order = Some("DESC".into());
        let params = ListParams::resolve(&req, &schema::CLIENT.list, PageSizing::default());
        assert_eq!((params.sort_by, params.order), ("city", SortOrder::Desc));

        // default sort of openings is newest first
        let params = ListParams::resolve(&request(), &schema::AGREEMENT_OPENING.list, PageSizing::default());
        assert_eq!(params.order, SortOrder::Desc);
    }

    #[test]
    fn test_status_resolution() {
        let mut req = request();
        req.status = Some("cancelado".into());
        let params = ListParams::resolve(&req, &schema::CLIENT.list, PageSizing::default());
        assert_eq!(
            params.status,
            Some(StatusCondition::Flag { column: "cancelled", value: true })
        );
        assert_eq!(params.status_word.as_deref(), Some("cancelado"));

        req.status = Some("all".into());
        let params = ListParams::resolve(&req, &schema::CLIENT.list, PageSizing::default());
        assert_eq!(params.status, None);
        assert_eq!(params.status_word, None);

        req.status = Some("false".into());
        let params = ListParams::resolve(&req, &schema::AGREEMENT.list, PageSizing::default());
        assert_eq!(
            params.status,
            Some(StatusCondition::Flag { column: "active", value: false })
        );

        req.status = Some("inativo".into());
        let params = ListParams::resolve(&req, &schema::PRODUCT.list, PageSizing::default());
        assert_eq!(
            params.status,
            Some(StatusCondition::Code { column: "situation", value: "I" })
        );
    }

    #[test]
    fn test_per_page_policy() {
        let sizing = PageSizing::default();
        let mut req = request();
        req.per_page = Some("500".into());
        assert_eq!(ListParams::resolve(&req, &schema::CLIENT.list, sizing).per_page, 100);
        req.per_page = Some("0".into());
        assert_eq!(ListParams::resolve(&req, &schema::CLIENT.list, sizing).per_page, 10);
        req.per_page = Some("25".into());
        assert_eq!(ListParams::resolve(&req, &schema::CLIENT.list, sizing).per_page, 25);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut req = request();
        req.search = Some("   ".into());
        let params = ListParams::resolve(&req, &schema::CLIENT.list, PageSizing::default());
        assert_eq!(params.search, None);
    }

    #[test]
    fn test_page_metadata() {
        let params = ListParams::resolve(&request(), &schema::CLIENT.list, PageSizing::default());
        let paginator = Paginator::new(25, params.per_page);
        let page = Page::new(vec![1, 2, 3, 4, 5], &params, paginator, 3);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_previous);
        assert!(!page.pagination.has_next);
        assert_eq!(page.filters.sort_by, "full_name");
    }
}
