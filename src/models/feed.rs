// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed pagination and filtering.

use serde::Deserialize;
use validator::Validate;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 25;
pub const MAX_TAGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw feed query string (`?limit=&offset=&sort=&search=&tags=a,b`).
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<SortOrder>,
    pub search: Option<String>,
    pub tags: Option<String>,
}

/// Validated feed query.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct FeedQuery {
    #[validate(range(min = 1, max = 25))]
    pub limit: i64,
    #[validate(range(min = 0))]
    pub offset: i64,
    pub sort: SortOrder,
    #[validate(length(max = 100))]
    pub search: String,
    #[validate(length(max = 5))]
    pub tags: Vec<String>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortOrder::Desc,
            search: String::new(),
            tags: Vec::new(),
        }
    }
}

impl From<FeedParams> for FeedQuery {
    fn from(params: FeedParams) -> Self {
        let defaults = FeedQuery::default();
        Self {
            limit: params.limit.unwrap_or(defaults.limit),
            offset: params.offset.unwrap_or(defaults.offset),
            sort: params.sort.unwrap_or(defaults.sort),
            search: params.search.unwrap_or_default(),
            tags: params
                .tags
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
