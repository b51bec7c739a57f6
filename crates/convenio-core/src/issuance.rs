//! # Issuance Validation
//!
//! Cross-entity checks for a credit issuance: the client is resolved by tax
//! ID, the requested value is bounded by the client's current balance and
//! the installment count by the agreement's limit.
//!
//! ## Flow
//! ```text
//! IssuanceRequest (raw text)
//!      │
//!      │  caller fetches, explicitly:
//!      │    clients WHERE tax_id = digits LIMIT 2
//!      │    client  WHERE id = client_id        (if submitted)
//!      │    agreement WHERE id = agreement_id   (if submitted)
//!      ▼
//! IssuanceContext ──► validate_issuance()
//!                        1. tax ID → digits, required
//!                        2. exactly one client, else field error
//!                        3. resolved client ≠ submitted client → form error
//!                        4. balance := client's stored balance
//!                        5. reference month MM/AAAA (or MMAAAA) → MMYYYY
//!                        6. 0 < value ≤ balance
//!                        7. 0 < installments ≤ agreement limit
//!                        8. all errors reported together
//!                        │
//!                        ├── Ok(ValidatedIssuance)   normalized values only
//!                        └── Err(FormErrors)
//! ```
//!
//! The validator is pure: it never touches the store. The write path
//! re-checks the balance inside its transaction and guards the write with
//! the client's `version`, so two concurrent issuances cannot both pass on
//! the same stale balance.

use serde::Serialize;

use crate::catalog::{Agreement, Client};
use crate::error::ValidationError;
use crate::forms::{FormErrors, RawForm};
use crate::money::Money;
use crate::schema;
use crate::types::{ReferenceMonth, TaxId, ISSUANCE_YEAR_MAX, REFERENCE_YEAR_MIN};
use crate::validation::{validate_installment_count, MAX_INSTALLMENTS};

/// Message for a tax ID that matches no client.
pub const CLIENT_NOT_FOUND: &str = "No client found with this CPF/CNPJ.";

/// Message for a tax ID shared by several clients.
pub const MULTIPLE_CLIENTS: &str = "Multiple clients found with this CPF/CNPJ. Contact support.";

/// Message for a tax ID that names a different client than the one selected.
pub const CLIENT_MISMATCH: &str =
    "Inconsistency: the CPF/CNPJ entered does not match the selected client.";

/// The raw issuance fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuanceRequest {
    pub tax_id: Option<String>,
    pub client_id: Option<String>,
    pub value: Option<String>,
    pub installments: Option<String>,
    pub agreement_id: Option<String>,
    pub reference_month: Option<String>,
}

impl IssuanceRequest {
    pub fn from_form(form: &RawForm) -> Self {
        let field = |name: &str| form.get(name).map(str::to_string);
        IssuanceRequest {
            tax_id: field("tax_id"),
            client_id: field("client_id"),
            value: field("value"),
            installments: field("installments"),
            agreement_id: field("agreement_id"),
            reference_month: field("reference_month"),
        }
    }

    /// The submitted tax ID reduced to digits (empty when missing).
    pub fn tax_id_digits(&self) -> String {
        self.tax_id.as_deref().map(TaxId::digits).unwrap_or_default()
    }

    /// The submitted client identifier, when it is a well-formed UUID.
    pub fn client_id(&self) -> Option<&str> {
        well_formed_id(self.client_id.as_deref())
    }

    /// The submitted agreement identifier, when it is a well-formed UUID.
    pub fn agreement_id(&self) -> Option<&str> {
        well_formed_id(self.agreement_id.as_deref())
    }
}

fn well_formed_id(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|id| uuid::Uuid::parse_str(id).is_ok())
}

/// Records fetched for one validation run.
#[derive(Debug, Clone, Default)]
pub struct IssuanceContext {
    /// Clients carrying the cleaned tax ID (fetch at most two)
    pub tax_id_matches: Vec<Client>,
    /// The client named by `client_id`, if it resolved
    pub submitted_client: Option<Client>,
    /// The agreement named by `agreement_id`, if it resolved
    pub agreement: Option<Agreement>,
}

/// A fully validated issuance with every value normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedIssuance {
    pub client_id: String,
    /// Digits only
    pub tax_id: String,
    /// The client's stored balance at validation time
    pub balance_snapshot: Money,
    /// The client's version at validation time
    pub client_version: i64,
    pub agreement_id: String,
    pub value: Money,
    pub installments: i32,
    pub reference_month: ReferenceMonth,
}

/// Parses an issuance reference month: `MM/AAAA`, or the six-digit `MMAAAA`.
///
/// ## Example
/// ```rust
/// use convenio_core::issuance::parse_issuance_month;
///
/// assert_eq!(parse_issuance_month("07/2025").unwrap().storage_code(), "072025");
/// assert_eq!(parse_issuance_month("072025").unwrap().storage_code(), "072025");
/// assert!(parse_issuance_month("13/2025").is_err());
/// assert!(parse_issuance_month("07/1899").is_err());
/// ```
pub fn parse_issuance_month(raw: &str) -> Result<ReferenceMonth, ValidationError> {
    let raw = raw.trim();
    if raw.contains('/') {
        ReferenceMonth::parse_display(raw, REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX)
    } else {
        ReferenceMonth::parse_storage(raw, REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX)
    }
}

/// Runs every issuance rule and either returns the normalized issuance or
/// all the errors found.
pub fn validate_issuance(
    request: &IssuanceRequest,
    ctx: &IssuanceContext,
) -> Result<ValidatedIssuance, FormErrors> {
    let schema = &schema::ISSUANCE;
    let label = |name: &str| schema.label_of(name);
    let mut errors = FormErrors::new();

    // 1-2. tax ID → exactly one client
    let tax_id = request.tax_id_digits();
    let resolved = if tax_id.is_empty() {
        errors.add_error("tax_id", &ValidationError::required(label("tax_id")));
        None
    } else {
        match ctx.tax_id_matches.as_slice() {
            [] => {
                errors.add("tax_id", CLIENT_NOT_FOUND);
                None
            }
            [client] => Some(client),
            _ => {
                errors.add("tax_id", MULTIPLE_CLIENTS);
                None
            }
        }
    };

    // 3. the selected client must agree with the tax ID
    let submitted = match (request.client_id.as_deref(), ctx.submitted_client.as_ref()) {
        (Some(_), None) => {
            errors.add("client_id", "Invalid client identifier or client not found.");
            None
        }
        (_, submitted) => submitted,
    };
    if let (Some(resolved), Some(submitted)) = (resolved, submitted) {
        if resolved.id != submitted.id {
            errors.add_non_field(CLIENT_MISMATCH);
        }
    }

    // 4. the working balance is always the stored one
    let client = resolved.or(submitted);
    let balance = client.map(Client::balance);

    // 5. reference month
    let reference_month = match request.reference_month.as_deref() {
        Some(raw) => match parse_issuance_month(raw) {
            Ok(month) => Some(month),
            Err(err) => {
                errors.add_error("reference_month", &relabelled(err, label("reference_month")));
                None
            }
        },
        None => {
            errors.add_error(
                "reference_month",
                &ValidationError::required(label("reference_month")),
            );
            None
        }
    };

    // 6. 0 < value ≤ balance
    let value = match request.value.as_deref() {
        Some(raw) => match raw.parse::<Money>() {
            Ok(value) if !value.is_positive() => {
                errors.add_error(
                    "value",
                    &ValidationError::MustBePositive {
                        field: label("value").to_string(),
                    },
                );
                None
            }
            Ok(value) => {
                if let Some(balance) = balance {
                    if value > balance {
                        errors.add(
                            "value",
                            format!(
                                "Transaction value ({}) exceeds the client's available balance ({}).",
                                value, balance
                            ),
                        );
                    }
                }
                Some(value)
            }
            Err(err) => {
                errors.add_error("value", &ValidationError::invalid(label("value"), err.to_string()));
                None
            }
        },
        None => {
            errors.add_error("value", &ValidationError::required(label("value")));
            None
        }
    };

    // 7. 0 < installments ≤ agreement limit (and never above MAX_INSTALLMENTS)
    let agreement = match (request.agreement_id.as_deref(), ctx.agreement.as_ref()) {
        (None, _) => {
            errors.add_error("agreement_id", &ValidationError::required(label("agreement_id")));
            None
        }
        (Some(_), None) => {
            errors.add("agreement_id", "Agreement not found.");
            None
        }
        (Some(_), Some(agreement)) => Some(agreement),
    };
    let installments = match request.installments.as_deref() {
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n <= 0 || n > i64::from(MAX_INSTALLMENTS) => {
                if let Err(e) = validate_installment_count(label("installments"), n) {
                    errors.add_error("installments", &e);
                }
                None
            }
            Ok(n) => {
                if let Some(agreement) = agreement {
                    if n > i64::from(agreement.max_installments) {
                        errors.add(
                            "installments",
                            format!(
                                "Installment count ({}) exceeds the agreement's limit of {}.",
                                n, agreement.max_installments
                            ),
                        );
                    }
                }
                i32::try_from(n).ok()
            }
            Err(_) => {
                errors.add_error(
                    "installments",
                    &ValidationError::invalid(label("installments"), "must be a whole number"),
                );
                None
            }
        },
        None => {
            errors.add_error("installments", &ValidationError::required(label("installments")));
            None
        }
    };

    // 8. all or nothing
    match (client, agreement, value, installments, reference_month) {
        (Some(client), Some(agreement), Some(value), Some(installments), Some(reference_month))
            if errors.is_empty() =>
        {
            Ok(ValidatedIssuance {
                client_id: client.id.clone(),
                tax_id,
                balance_snapshot: client.balance(),
                client_version: client.version,
                agreement_id: agreement.id.clone(),
                value,
                installments,
                reference_month,
            })
        }
        _ => {
            if errors.is_empty() {
                errors.add_non_field("The issuance could not be validated.");
            }
            Err(errors)
        }
    }
}

fn relabelled(err: ValidationError, label: &str) -> ValidationError {
    match err {
        ValidationError::InvalidFormat { reason, .. } => ValidationError::invalid(label, reason),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const CLIENT_ID: &str = "c5d1c8a2-6e0b-4f7a-8c3d-1b2a3c4d5e6f";
    const OTHER_ID: &str = "d6e2d9b3-7f1c-4a8b-9d4e-2c3b4d5e6f70";
    const AGREEMENT_ID: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

    fn client(id: &str, balance_cents: i64) -> Client {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Client {
            id: id.to_string(),
            internal_code: format!("C-{}", &id[..4]),
            registration: None,
            cancelled: false,
            full_name: "Ana Souza".to_string(),
            tax_id: "12345678901".to_string(),
            rg: None,
            phone: None,
            email: "ana@example.com".to_string(),
            street: None,
            postal_code: None,
            city: "Recife".to_string(),
            state: "PE".to_string(),
            salary_cents: 0,
            percentage_hundredths: 0,
            balance_cents,
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    fn agreement(max_installments: i32) -> Agreement {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Agreement {
            id: AGREEMENT_ID.to_string(),
            store_code: Some(1),
            name: "Prefeitura".to_string(),
            tax_id: "12345678000190".to_string(),
            contact: None,
            email: None,
            phone: None,
            active: true,
            max_installments,
            event_code: None,
            logo_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(value: &str, installments: &str) -> IssuanceRequest {
        IssuanceRequest {
            tax_id: Some("123.456.789-01".to_string()),
            client_id: None,
            value: Some(value.to_string()),
            installments: Some(installments.to_string()),
            agreement_id: Some(AGREEMENT_ID.to_string()),
            reference_month: Some("07/2025".to_string()),
        }
    }

    fn context(balance_cents: i64, max_installments: i32) -> IssuanceContext {
        IssuanceContext {
            tax_id_matches: vec![client(CLIENT_ID, balance_cents)],
            submitted_client: None,
            agreement: Some(agreement(max_installments)),
        }
    }

    #[test]
    fn test_valid_issuance_is_normalized() {
        let validated = validate_issuance(&request("150,00", "3"), &context(90_000, 6)).unwrap();
        assert_eq!(validated.client_id, CLIENT_ID);
        assert_eq!(validated.tax_id, "12345678901");
        assert_eq!(validated.balance_snapshot, Money::from_cents(90_000));
        assert_eq!(validated.client_version, 4);
        assert_eq!(validated.reference_month.storage_code(), "072025");
        assert_eq!(validated.value, Money::from_cents(15_000));
        assert_eq!(validated.installments, 3);
    }

    #[test]
    fn test_value_equal_to_balance_is_accepted() {
        assert!(validate_issuance(&request("900.00", "1"), &context(90_000, 1)).is_ok());
    }

    #[test]
    fn test_value_above_balance_reports_both_values() {
        let errors = validate_issuance(&request("900.01", "1"), &context(90_000, 1)).unwrap_err();
        assert_eq!(
            errors.messages("value"),
            ["Transaction value (R$ 900.01) exceeds the client's available balance (R$ 900.00)."]
        );
    }

    #[test]
    fn test_installments_above_limit() {
        let errors = validate_issuance(&request("10", "7"), &context(90_000, 6)).unwrap_err();
        assert_eq!(
            errors.messages("installments"),
            ["Installment count (7) exceeds the agreement's limit of 6."]
        );
        let errors = validate_issuance(&request("10", "0"), &context(90_000, 6)).unwrap_err();
        assert_eq!(errors.messages("installments"), ["Installments must be greater than zero"]);
    }

    #[test]
    fn test_installments_above_ceiling_even_without_agreement_limit() {
        for raw in ["361", "2147483647", "99999999999"] {
            let errors =
                validate_issuance(&request("10", raw), &context(90_000, i32::MAX)).unwrap_err();
            assert_eq!(
                errors.messages("installments"),
                ["Installments must be between 1 and 360"],
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_tax_id_resolution_failures() {
        let mut req = request("10", "1");
        req.tax_id = Some("..-".to_string());
        let errors = validate_issuance(&req, &context(90_000, 1)).unwrap_err();
        assert_eq!(errors.messages("tax_id"), ["CPF/CNPJ is required"]);

        let mut ctx = context(90_000, 1);
        ctx.tax_id_matches.clear();
        let errors = validate_issuance(&request("10", "1"), &ctx).unwrap_err();
        assert_eq!(errors.messages("tax_id"), [CLIENT_NOT_FOUND]);

        ctx.tax_id_matches = vec![client(CLIENT_ID, 1), client(OTHER_ID, 1)];
        let errors = validate_issuance(&request("10", "1"), &ctx).unwrap_err();
        assert_eq!(errors.messages("tax_id"), [MULTIPLE_CLIENTS]);
    }

    #[test]
    fn test_client_mismatch_is_form_level() {
        let mut req = request("10", "1");
        req.client_id = Some(OTHER_ID.to_string());
        let mut ctx = context(90_000, 1);
        ctx.submitted_client = Some(client(OTHER_ID, 5_000_000));
        let errors = validate_issuance(&req, &ctx).unwrap_err();
        assert_eq!(errors.non_field, [CLIENT_MISMATCH]);
        assert!(errors.fields.is_empty());
    }

    #[test]
    fn test_submitted_balance_is_never_trusted() {
        // the resolved client's stored balance bounds the value
        let mut ctx = context(1_000, 1);
        ctx.submitted_client = Some(client(CLIENT_ID, 1_000));
        let mut req = request("50", "1");
        req.client_id = Some(CLIENT_ID.to_string());
        assert!(validate_issuance(&req, &ctx).unwrap_err().has_field("value"));
    }

    #[test]
    fn test_errors_accumulate() {
        let req = IssuanceRequest {
            tax_id: Some("123.456.789-01".to_string()),
            value: Some("-5".to_string()),
            installments: Some("x".to_string()),
            reference_month: Some("13/2025".to_string()),
            ..Default::default()
        };
        let errors = validate_issuance(&req, &context(90_000, 6)).unwrap_err();
        for field in ["value", "installments", "reference_month", "agreement_id"] {
            assert!(errors.has_field(field), "missing error for {}", field);
        }
        assert!(!errors.has_field("tax_id"));
    }

    #[test]
    fn test_reference_month_bounds() {
        let mut req = request("10", "1");
        req.reference_month = Some("07/1899".to_string());
        let errors = validate_issuance(&req, &context(90_000, 1)).unwrap_err();
        assert_eq!(
            errors.messages("reference_month"),
            ["Reference month has invalid format: year must be between 1900 and 2100"]
        );
        req.reference_month = Some("122100".to_string());
        assert!(validate_issuance(&req, &context(90_000, 1)).is_ok());
    }
}
