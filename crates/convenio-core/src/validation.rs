//! # Validation Module
//!
//! Field validators shared by the form cleaners and the issuance validator.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form cleaners (forms::*)                                     │
//! │  ├── Parse raw text into typed values                                  │
//! │  └── Required / length checks driven by the entity schema              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Fixed-length fiscal codes (CFOP, CEST, CST/CSOSN)                 │
//! │  ├── Ranges (percentages, reference-month years)                       │
//! │  └── Cross-field rules (date ordering, service flags)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators take the display label of the field they check so the
//! resulting message reads naturally next to the input.
//!
//! ## Usage
//! ```rust
//! use convenio_core::validation::{validate_cfop, validate_cest};
//!
//! assert_eq!(validate_cfop("CFOP", "5102").unwrap(), "5102");
//! assert_eq!(validate_cest("CEST", "01.001.00").unwrap(), "0100100");
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    Percentage, ProductKind, ReferenceMonth, TaxId, TaxRegime, OPENING_YEARS_AHEAD,
    REFERENCE_YEAR_MIN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest search term applied to a list query.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Normalizes a list search term.
///
/// ## Rules
/// - Surrounding whitespace is dropped
/// - Blank terms mean "no search"
/// - Longer terms are cut to [`MAX_SEARCH_LEN`] characters
pub fn normalize_search_query(query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    Some(query.chars().take(MAX_SEARCH_LEN).collect())
}

/// Checks a text length in characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a two-letter state code and upper-cases it.
///
/// ## Example
/// ```rust
/// use convenio_core::validation::validate_state;
///
/// assert_eq!(validate_state("State", " sp ").unwrap(), "SP");
/// assert!(validate_state("State", "São Paulo").is_err());
/// ```
pub fn validate_state(field: &str, raw: &str) -> ValidationResult<String> {
    let state = raw.trim();
    if state.chars().count() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::invalid(field, "use the two-letter state code"));
    }
    Ok(state.to_ascii_uppercase())
}

/// Validates an e-mail address (shape only: `local@domain.tld`).
pub fn validate_email(field: &str, raw: &str) -> ValidationResult<String> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::invalid(field, "enter a valid e-mail address"));
    }
    Ok(email.to_string())
}

// =============================================================================
// Fiscal Code Validators
// =============================================================================

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Validates a CFOP: exactly 4 digits.
pub fn validate_cfop(field: &str, raw: &str) -> ValidationResult<String> {
    let code = raw.trim();
    if code.len() != 4 || !is_digits(code) {
        return Err(ValidationError::invalid(field, "must have exactly 4 digits"));
    }
    Ok(code.to_string())
}

/// Validates a CEST: 7 or 9 digits once punctuation is stripped.
///
/// Returns the digits-only form.
pub fn validate_cest(field: &str, raw: &str) -> ValidationResult<String> {
    let digits = TaxId::digits(raw);
    match digits.len() {
        7 | 9 => Ok(digits),
        _ => Err(ValidationError::invalid(field, "must have 7 or 9 digits")),
    }
}

/// Validates a CST/CSOSN: exactly 3 digits.
pub fn validate_cst_cson(field: &str, raw: &str) -> ValidationResult<String> {
    let code = raw.trim();
    if code.chars().count() != 3 {
        return Err(ValidationError::invalid(field, "must have exactly 3 digits"));
    }
    if !is_digits(code) {
        return Err(ValidationError::invalid(field, "must contain only numbers"));
    }
    Ok(code.to_string())
}

/// Restricts a CST/CSOSN regime to Simples Nacional (1) or Regime Normal (3).
pub fn validate_cst_regime(field: &str, regime: TaxRegime) -> ValidationResult<TaxRegime> {
    match regime {
        TaxRegime::SimplesNacional | TaxRegime::RegimeNormal => Ok(regime),
        TaxRegime::SimplesExcessoSublimite => Err(ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: vec!["1".to_string(), "3".to_string()],
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a percentage between 0.00 and 100.00 inclusive.
pub fn validate_percentage(field: &str, pct: Percentage) -> ValidationResult<Percentage> {
    if !pct.is_within_full_range() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(pct)
}

/// Validates a strictly positive amount.
pub fn validate_positive_money(field: &str, amount: Money) -> ValidationResult<Money> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(amount)
}

/// Validates a non-negative amount (prices, salaries).
pub fn validate_non_negative_money(field: &str, amount: Money) -> ValidationResult<Money> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(amount)
}

/// Most installments any agreement, issuance or sale may carry (30 years
/// of monthly dues).
pub const MAX_INSTALLMENTS: i32 = 360;

/// Validates an installment count: 1 to [`MAX_INSTALLMENTS`].
pub fn validate_installment_count(field: &str, count: i64) -> ValidationResult<i32> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if count > i64::from(MAX_INSTALLMENTS) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::from(MAX_INSTALLMENTS),
        });
    }
    Ok(count as i32)
}

/// Client balance: salary × percentage / 100, rounded to the cent.
///
/// ## Example
/// ```rust
/// use convenio_core::money::Money;
/// use convenio_core::types::Percentage;
/// use convenio_core::validation::compute_client_balance;
///
/// let balance = compute_client_balance(Money::from_cents(300_000), Percentage::from_hundredths(3000));
/// assert_eq!(balance.cents(), 90_000); // 30% of R$ 3000.00
/// ```
pub fn compute_client_balance(salary: Money, percentage: Percentage) -> Money {
    salary.percent_of(percentage)
}

// =============================================================================
// Date Validators
// =============================================================================

/// Checks that `later` does not precede `earlier`.
pub fn validate_date_order(
    field: &str,
    later: NaiveDate,
    other: &str,
    earlier: NaiveDate,
) -> ValidationResult<()> {
    if later < earlier {
        return Err(ValidationError::DateBefore {
            field: field.to_string(),
            other: other.to_string(),
        });
    }
    Ok(())
}

/// Validates an opening-period reference month (`MM/AAAA`).
///
/// ## Rules
/// - Two-digit month 01..12, slash, four-digit year
/// - Year between 1900 and `current_year + 50`
///
/// `current_year` comes from the request context, never from a global clock.
pub fn validate_opening_month(raw: &str, current_year: i32) -> ValidationResult<ReferenceMonth> {
    ReferenceMonth::parse_display(raw, REFERENCE_YEAR_MIN, current_year + OPENING_YEARS_AHEAD)
}

// =============================================================================
// Cross-field Validators
// =============================================================================

/// Which flags a service product illegally carries.
///
/// A service may be neither weighed nor marked for own use. Returns the
/// names of the offending fields (empty when the product is consistent).
pub fn service_flag_violations(kind: ProductKind, weighed: bool, own_use: bool) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if kind == ProductKind::Service {
        if weighed {
            fields.push("weighed");
        }
        if own_use {
            fields.push("own_use");
        }
    }
    fields
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use convenio_core::validation::validate_uuid;
///
/// assert!(validate_uuid("Client", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("Client", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid identifier".to_string(),
    })?;

    Ok(id.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
