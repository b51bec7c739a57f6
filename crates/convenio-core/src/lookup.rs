//! # Lookup Responses
//!
//! Shapes returned by the read-only lookup endpoints.
//!
//! ```text
//! client by tax ID   → {"id": "...", "name": "Ana Souza", "balance": "900.00"}
//!                    → {"id": null, "name": "Client not found.", "balance": "0.00"}
//! installment limit  → {"max_installments": 6}
//! issuance details   → {"client_id": ..., "agreement_id": ..., "value": "150.00", ...}
//! ```
//!
//! A client that does not exist is a normal answer (the sentinel), not an
//! error, so callers can tell absence from failure.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::{Agreement, Client, Issuance};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Name shown when no client carries the requested tax ID.
pub const CLIENT_NOT_FOUND_NAME: &str = "Client not found.";

/// A client resolved by tax ID, or the not-found sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientLookup {
    pub id: Option<String>,
    pub name: String,
    /// Plain decimal text, e.g. "900.00"
    pub balance: String,
}

impl ClientLookup {
    pub fn found(client: &Client) -> Self {
        ClientLookup {
            id: Some(client.id.clone()),
            name: client.full_name.clone(),
            balance: client.balance().to_decimal_string(),
        }
    }

    pub fn not_found() -> Self {
        ClientLookup {
            id: None,
            name: CLIENT_NOT_FOUND_NAME.to_string(),
            balance: Money::zero().to_decimal_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.id.is_some()
    }
}

impl ClientLookup {
    /// Answers a lookup from the clients stored under `tax_id`.
    ///
    /// ```text
    /// 0 matches   → not-found sentinel
    /// 1 match     → that client
    /// 2+ matches  → CoreError::DuplicateTaxId
    /// ```
    pub fn resolve(tax_id: &str, matches: &[Client]) -> CoreResult<Self> {
        match matches {
            [] => Ok(ClientLookup::not_found()),
            [client] => Ok(ClientLookup::found(client)),
            _ => Err(CoreError::DuplicateTaxId(tax_id.to_string())),
        }
    }
}

/// An agreement's installment limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstallmentLimit {
    pub max_installments: i32,
}

impl From<&Agreement> for InstallmentLimit {
    fn from(agreement: &Agreement) -> Self {
        InstallmentLimit {
            max_installments: agreement.max_installments,
        }
    }
}

/// What a sale form pre-fills from the chosen issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IssuanceDetails {
    pub client_id: String,
    pub client_name: String,
    pub agreement_id: String,
    pub agreement_name: String,
    pub value: String,
    pub installments: i32,
}

impl From<&Issuance> for IssuanceDetails {
    fn from(issuance: &Issuance) -> Self {
        IssuanceDetails {
            client_id: issuance.client_id.clone(),
            client_name: issuance.client_name.clone(),
            agreement_id: issuance.agreement_id.clone(),
            agreement_name: issuance.agreement_name.clone(),
            value: issuance.value().to_decimal_string(),
            installments: issuance.installments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn client(id: &str) -> Client {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Client {
            id: id.to_string(),
            internal_code: "C001".to_string(),
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
            salary_cents: 300_000,
            percentage_hundredths: 3000,
            balance_cents: 90_000,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_by_match_count() {
        let found = ClientLookup::resolve("12345678901", &[client("a")]).unwrap();
        assert_eq!(found.id.as_deref(), Some("a"));
        assert_eq!(found.balance, "900.00");

        let err = ClientLookup::resolve("12345678901", &[client("a"), client("b")]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTaxId(ref digits) if digits == "12345678901"));
    }

    #[test]
    fn test_not_found_sentinel_shape() {
        let json = serde_json::to_value(ClientLookup::not_found()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": null, "name": "Client not found.", "balance": "0.00"})
        );
        assert!(!ClientLookup::resolve("12345678901", &[]).unwrap().is_found());
    }
}
