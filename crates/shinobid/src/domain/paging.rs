use std::collections::HashMap;
use std::hash::BuildHasher;

use serde::Serialize;

use super::validation::{FieldError, TextLimits, ValidationErrors, check_length};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_SIZE: u32 = 10;
const MAX_SIZE: u32 = 100;
const SEARCH_LIMITS: TextLimits = TextLimits::new(3, 50);

/// Requested window over an ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Builds a request; callers must have validated `page >= 1` and
    /// `1 <= size <= 100`.
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_SIZE)
    }
}

/// One page of results with navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Records on this page, ordered by id.
    pub items: Vec<T>,
    /// Number of records matching the filters.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Number of pages needed for `total` records.
    pub pages: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Assembles a page from the fetched rows and the unpaged total.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let pages = total.div_ceil(u64::from(request.size.max(1)));
        let page = request.page;
        Self {
            items,
            total,
            page,
            size: request.size,
            pages,
            has_next: u64::from(page) < pages,
            has_prev: page > 1,
        }
    }
}

/// Validated list query: paging, free-text search and an optional owner
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Window to return.
    pub paging: PageRequest,
    /// Substring to search for, 3 to 50 characters.
    pub search: Option<String>,
    /// Restricts jutsus to one character.
    pub character_id: Option<i64>,
}

impl ListQuery {
    /// Parses raw query-string pairs, collecting every invalid parameter.
    pub fn from_params<S: BuildHasher>(
        params: &HashMap<String, String, S>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let page = bounded(params, "page", DEFAULT_PAGE, (1, None), &mut errors);
        let size = bounded(params, "size", DEFAULT_SIZE, (1, Some(MAX_SIZE)), &mut errors);
        let search = params.get("search").and_then(|raw| {
            if let Some(error) = check_length("search", raw, SEARCH_LIMITS) {
                errors.push(error);
                return None;
            }
            Some(raw.clone())
        });
        let character_id = params
            .get("character_id")
            .and_then(|raw| match raw.trim().parse::<i64>() {
                Ok(id) if id >= 1 => Some(id),
                Ok(_) => {
                    errors.push(FieldError::below_minimum("character_id", 1));
                    None
                }
                Err(_) => {
                    errors.push(FieldError::unparsable_integer("character_id"));
                    None
                }
            });
        errors.into_result()?;
        Ok(Self {
            paging: PageRequest::new(page, size),
            search,
            character_id,
        })
    }
}

fn bounded<S: BuildHasher>(
    params: &HashMap<String, String, S>,
    field: &str,
    default: u32,
    (min, max): (u32, Option<u32>),
    errors: &mut ValidationErrors,
) -> u32 {
    let Some(raw) = params.get(field) else {
        return default;
    };
    let Ok(value) = raw.trim().parse::<i64>() else {
        errors.push(FieldError::unparsable_integer(field));
        return default;
    };
    if value < i64::from(min) {
        errors.push(FieldError::below_minimum(field, i64::from(min)));
        return default;
    }
    if let Some(max) = max
        && value > i64::from(max)
    {
        errors.push(FieldError::above_maximum(field, i64::from(max)));
        return default;
    }
    u32::try_from(value).unwrap_or_else(|_| {
        errors.push(FieldError::above_maximum(field, i64::from(u32::MAX)));
        default
    })
}
