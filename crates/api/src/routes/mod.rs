pub mod activity;
pub mod customer;
pub mod lead;
pub mod leave;
pub mod notification;
pub mod report;
pub mod target;
pub mod task;
pub mod user;

use std::str::FromStr;

use bson::oid::ObjectId;
use leadflow_services::dao::base::{PaginatedResult, PaginationParams};
use leadflow_services::time::{DateRange, ist_to_utc};
use leadflow_services::visibility::ScopeFilter;
use serde::Deserialize;

use crate::error::ApiError;

pub fn parse_id(field: &str, value: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

pub fn parse_opt_id(field: &str, value: Option<&str>) -> Result<Option<ObjectId>, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_id(field, v))
        .transpose()
}

/// Comma-separated enum values, e.g. `status=new,won`.
pub fn parse_list<T>(field: &str, value: Option<&str>) -> Result<Vec<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(|e| ApiError::validation(field, e)))
        .collect()
}

pub fn ist_millis(field: &str, value: Option<i64>) -> Result<Option<bson::DateTime>, ApiError> {
    Ok(value.map(|v| ist_to_utc(field, v)).transpose()?)
}

pub fn replace_items<T, U>(page: PaginatedResult<T>, items: Vec<U>) -> PaginatedResult<U> {
    PaginatedResult {
        items,
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }
}

/// Query parameters shared by every list endpoint. Times are IST millis.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub manager: Option<String>,
    pub staff: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    pub fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::from_ist_millis(self.start, self.end)?)
    }

    pub fn scope(&self) -> Result<ScopeFilter, ApiError> {
        Ok(ScopeFilter {
            manager: parse_opt_id("manager", self.manager.as_deref())?,
            staff: parse_opt_id("staff", self.staff.as_deref())?,
        })
    }
}
