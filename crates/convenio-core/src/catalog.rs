//! # Entity Catalog
//!
//! The persisted records of the back office, one struct per table.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Company ◄──(set null)── User                                         │
//! │                              ▲                                          │
//! │                              │ restrict                                 │
//! │   Client ◄──restrict── Issuance ◄──restrict── Sale                     │
//! │                           │   ▲                 │                       │
//! │   Agreement ◄──restrict───┘   └──cascade── Installment                  │
//! │       ▲                                        │                        │
//! │       └──────────────restrict──────────────────┘                        │
//! │                                                                         │
//! │   Group ◄──cascade── SubGroup                                          │
//! │                                                                         │
//! │   Product ──(set null)──► Sector, Group, SubGroup,                     │
//! │                           NCM, CFOP, CEST, CST/CSON                    │
//! │                                                                         │
//! │   AgreementOpening (stand-alone billing calendar)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id` is a UUID v4 string; business codes (`internal_code`, `store_code`,
//!   `code`) are separate unique columns.
//! - Money is `*_cents`, percentages `*_hundredths`, quantities `*_thousandths`;
//!   the typed accessors wrap them.
//! - Fields such as `client_name` on [`Issuance`] are filled by an explicit
//!   join when the record is read, never by lazy traversal.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    AccessLevel, CompanySituation, CompanySize, OpeningStatus, PaymentStatus, Percentage,
    Permission, ProductKind, ProductSituation, Quantity, RecordStatus, SaleUnit, TaxId,
    TaxRegime, Taxation,
};

// =============================================================================
// Registry: clients, companies, users
// =============================================================================

/// A person who can draw credit under an agreement.
///
/// ## Balance Invariant
/// `balance_cents == salary × percentage / 100`, recomputed on every save.
/// `version` increases whenever an issuance is written against the client,
/// which lets the issuance write path detect concurrent submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub internal_code: String,
    pub registration: Option<String>,
    pub cancelled: bool,
    pub full_name: String,
    /// Digits only
    pub tax_id: String,
    pub rg: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub state: String,
    pub salary_cents: i64,
    pub percentage_hundredths: i64,
    pub balance_cents: i64,
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    #[inline]
    pub fn salary(&self) -> Money {
        Money::from_cents(self.salary_cents)
    }

    #[inline]
    pub fn percentage(&self) -> Percentage {
        Percentage::from_hundredths(self.percentage_hundredths)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    pub fn tax_id(&self) -> TaxId {
        TaxId::from_stored(self.tax_id.clone())
    }
}

/// A store (legal entity) operating the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub id: String,
    pub store_code: String,
    /// Digits only (14)
    pub tax_id: String,
    pub state_registration: Option<String>,
    pub size: Option<CompanySize>,
    pub situation: CompanySituation,
    #[ts(as = "Option<String>")]
    pub opened_on: Option<NaiveDate>,
    pub name: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub main_cnae: Option<String>,
    pub simples_rate_hundredths: Option<i64>,
    pub tax_regime: TaxRegime,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn simples_rate(&self) -> Option<Percentage> {
        self.simples_rate_hundredths.map(Percentage::from_hundredths)
    }
}

/// A back-office operator account.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub company_id: Option<String>,
    pub access_level: AccessLevel,
    pub permission: Permission,
    pub name: String,
    pub username: String,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product classification tables
// =============================================================================

/// A code/description row. Sectors, categories and product groups share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Classification {
    pub id: String,
    pub code: String,
    pub description: String,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A subdivision of a product group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SubGroup {
    pub id: String,
    pub group_id: String,
    /// Joined from the parent group
    pub group_description: String,
    pub name: String,
    pub status: RecordStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Mercosur common nomenclature entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Ncm {
    pub id: String,
    pub code: String,
    pub description: String,
    #[ts(as = "Option<String>")]
    pub valid_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,
    pub year: Option<String>,
    pub number: Option<String>,
    pub segment: Option<String>,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fiscal operation code (4 digits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cfop {
    pub id: String,
    pub code: String,
    pub category: String,
    pub description: String,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Tax substitution code (7 or 9 digits, stored without punctuation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cest {
    pub id: String,
    pub code: String,
    pub description: String,
    pub ncm_code: Option<String>,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Tax situation code (CST) or Simples operation code (CSOSN), 3 digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CstCson {
    pub id: String,
    pub code: String,
    pub description: String,
    /// Only regimes 1 and 3 are valid here
    pub regime: TaxRegime,
    pub cancelled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub ean_code: String,
    pub description: String,
    pub pos_description: Option<String>,
    pub sale_unit: SaleUnit,
    pub package_qty_thousandths: i64,
    pub kind: ProductKind,
    pub weighed: bool,
    pub multipliable: bool,
    pub own_use: bool,
    pub situation: ProductSituation,
    pub icms_rate_hundredths: Option<i64>,
    pub stock_thousandths: i64,
    pub net_weight_thousandths: Option<i64>,
    pub gross_weight_thousandths: Option<i64>,
    pub price_cents: i64,
    pub classification: Option<String>,
    pub taxation: Taxation,
    pub sector_id: Option<String>,
    pub group_id: Option<String>,
    pub sub_group_id: Option<String>,
    pub cfop_id: Option<String>,
    pub cst_cson_id: Option<String>,
    pub ncm_id: Option<String>,
    pub cest_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn stock(&self) -> Quantity {
        Quantity::from_thousandths(self.stock_thousandths)
    }
}

// =============================================================================
// Agreements
// =============================================================================

/// A credit line arrangement with a third party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Agreement {
    pub id: String,
    pub store_code: Option<i64>,
    pub name: String,
    /// Digits only (14)
    pub tax_id: String,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub max_installments: i32,
    pub event_code: Option<String>,
    /// Opaque reference to the stored logo file
    pub logo_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A billing period that can be opened, closed and paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AgreementOpening {
    pub id: String,
    /// Display form, `MM/YYYY`
    pub reference_month: String,
    pub status: OpeningStatus,
    #[ts(as = "String")]
    pub opened_on: NaiveDate,
    #[ts(as = "Option<String>")]
    pub closed_on: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub paid_on: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A credit drawdown against a client's balance under an agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Issuance {
    pub id: String,
    /// Client tax ID at issuance time, digits only
    pub tax_id: String,
    pub client_id: String,
    /// Joined from the client
    pub client_name: String,
    /// Client balance observed when the issuance was accepted
    pub balance_snapshot_cents: i64,
    /// Storage form, `MMYYYY`
    pub reference_month: String,
    pub agreement_id: String,
    /// Joined from the agreement
    pub agreement_name: String,
    pub installments: i32,
    pub value_cents: i64,
    #[ts(as = "String")]
    pub transaction_date: NaiveDate,
    #[ts(as = "String")]
    pub transaction_time: NaiveTime,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Issuance {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }

    #[inline]
    pub fn balance_snapshot(&self) -> Money {
        Money::from_cents(self.balance_snapshot_cents)
    }
}

/// One installment of an issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Installment {
    pub id: String,
    pub issuance_id: String,
    pub agreement_id: String,
    pub number: i32,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub payment_status: PaymentStatus,
    pub value_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A sale settled through an issuance.
///
/// `client_id` and `agreement_id` are copied from the issuance at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    /// Joined from the user
    pub username: String,
    pub issuance_id: String,
    pub client_id: String,
    /// Joined from the client
    pub client_name: String,
    pub agreement_id: String,
    /// Joined from the agreement
    pub agreement_name: String,
    #[ts(as = "String")]
    pub sale_date: NaiveDate,
    #[ts(as = "String")]
    pub sale_time: NaiveTime,
    pub value_cents: i64,
    pub installments: i32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }
}
