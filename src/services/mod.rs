//! Lifecycle services. Each service owns the store handle and event channel it
//! was built with; commands do the writes and the services run rollup and
//! audit once a command has committed.

pub mod audit;
pub mod consignees;
pub mod loas;
pub mod procurement;
pub mod reconciliation;
pub mod rollup;
pub mod status_rules;
pub mod tenders;

use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};

/// Highest page number a listing accepts.
pub const MAX_PAGE: u64 = 1_000_000;

/// Normalises a 1-based page number, refusing pages whose row offset would
/// not fit the store's signed 64-bit OFFSET.
pub fn checked_page(page: u64, limit: u64) -> Result<u64, ServiceError> {
    let page = page.max(1);
    let offset = (page - 1).checked_mul(limit);
    match offset {
        Some(offset) if page <= MAX_PAGE && offset <= i64::MAX as u64 => Ok(page),
        _ => Err(ServiceError::ValidationError(format!(
            "page: must be between 1 and {}",
            MAX_PAGE
        ))),
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
