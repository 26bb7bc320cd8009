//! # HTTP Handlers
//!
//! One module per screen of the back office. Every handler follows the
//! same shape:
//!
//! ```text
//! State(state) + CurrentActor + Path/Query/Json
//!        │
//!        ├── actor.ensure(action, resource)?     (403 on failure)
//!        ├── state.db.<repository>().<op>(..)?   (DbError → ApiError)
//!        ▼
//! Json(result)
//! ```

pub mod customer;
pub mod expense;
pub mod health;
pub mod inventory;
pub mod order;
pub mod product;
pub mod report;
pub mod route;
pub mod session;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// `?from=2025-03-01&to=2025-03-31`, both inclusive.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn checked(self) -> ApiResult<Self> {
        if self.from > self.to {
            return Err(ApiError::validation(format!(
                "from ({}) must not be after to ({})",
                self.from, self.to
            )));
        }
        Ok(self)
    }
}

/// Trims a free-text field, mapping blank to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
