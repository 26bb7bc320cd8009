//! # Validation Module
//!
//! Input validation for AquaRoute records.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Front end form checks (empty, length)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Back-office handler                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules, tax ID format                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / UNIQUE / CHECK (quantity >= 0)                         │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aquaroute_core::types::CustomerKind;
//! use aquaroute_core::validation::{validate_customer_tax_id, validate_quantity};
//!
//! assert_eq!(
//!     validate_customer_tax_id(CustomerKind::Business, Some("12.345.678-k")).unwrap(),
//!     Some("12.345.678-K".to_string())
//! );
//! assert!(validate_quantity(0).is_err());
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::CustomerKind;
use crate::{CUSTOMER_CODE_PREFIX, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Tax ID (RUT)
// =============================================================================

/// `12.345.678-9` (dotted) or `12345678-9` (plain); check char is a digit or K.
fn tax_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,2}\.\d{3}\.\d{3}-[\dkK]|\d{7,8}-[\dkK])$").ok())
        .as_ref()
}

/// Validates a Chilean tax ID (RUT) and returns it with the check
/// character upper-cased.
///
/// ## Example
/// ```rust
/// use aquaroute_core::validation::validate_tax_id;
///
/// assert_eq!(validate_tax_id("12345678-k").unwrap(), "12345678-K");
/// assert!(validate_tax_id("12.345.6789").is_err());
/// ```
pub fn validate_tax_id(tax_id: &str) -> ValidationResult<String> {
    let tax_id = tax_id.trim();

    if tax_id.is_empty() {
        return Err(ValidationError::required("tax_id"));
    }

    let well_formed = tax_id_pattern()
        .map(|re| re.is_match(tax_id))
        .unwrap_or(false);

    if !well_formed {
        return Err(ValidationError::invalid_format(
            "tax_id",
            "expected 12.345.678-9 or 12345678-9",
        ));
    }

    Ok(tax_id.to_uppercase())
}

/// Applies the per-kind tax ID rule.
///
/// ## Rules
/// - Business customers must carry a valid tax ID
/// - Personal customers may omit it; blank input becomes `None`
/// - Anything non-blank must be well-formed regardless of kind
pub fn validate_customer_tax_id(
    kind: CustomerKind,
    tax_id: Option<&str>,
) -> ValidationResult<Option<String>> {
    match tax_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => validate_tax_id(value).map(Some),
        None if kind == CustomerKind::Business => Err(ValidationError::required("tax_id")),
        None => Ok(None),
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field and returns it trimmed.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a product code and returns it upper-cased.
///
/// ## Rules
/// - 1 to 30 characters
/// - Letters, digits, hyphens, underscores
///
/// ## Example
/// ```rust
/// use aquaroute_core::validation::validate_product_code;
///
/// assert_eq!(validate_product_code(" rec-20l ").unwrap(), "REC-20L");
/// assert!(validate_product_code("REC 20L").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<String> {
    let code = validate_text("code", code, 30)?;

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code.to_uppercase())
}

/// Loose email shape check: `local@domain.tld`.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);

    if !valid {
        return Err(ValidationError::invalid_format("email", "expected name@domain"));
    }

    Ok(email.to_string())
}

/// Trims a search query; empty means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: 1 to [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Prices may be zero (promotional items) but never negative.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Bottle counters and thresholds are non-negative counts.
pub fn validate_count(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Expense amounts must be positive.
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if amount.minor() <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates cart size before adding a new distinct line.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

/// Next customer code after the highest existing one.
///
/// ## Example
/// ```rust
/// use aquaroute_core::validation::next_customer_code;
///
/// assert_eq!(next_customer_code(None), "CLI001");
/// assert_eq!(next_customer_code(Some("CLI041")), "CLI042");
/// assert_eq!(next_customer_code(Some("CLI999")), "CLI1000");
/// ```
pub fn next_customer_code(latest: Option<&str>) -> String {
    let last = latest
        .and_then(|code| code.strip_prefix(CUSTOMER_CODE_PREFIX))
        .and_then(|digits| digits.parse::<u32>().ok())
        .unwrap_or(0);

    format!("{}{:03}", CUSTOMER_CODE_PREFIX, last + 1)
}

// =============================================================================
// Unit Tests
// =============================================================================
