//! Client, company and user forms.

use chrono::NaiveDate;
use std::fmt;

use super::{Cleaner, FormContext, FormErrors, FormMode, RawForm};
use crate::error::ValidationError;
use crate::money::Money;
use crate::schema;
use crate::types::{AccessLevel, CompanySituation, CompanySize, Percentage, Permission, TaxRegime};
use crate::validation::{compute_client_balance, validate_non_negative_money, validate_state};

// =============================================================================
// Client
// =============================================================================

/// A validated client submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDraft {
    pub internal_code: String,
    pub registration: Option<String>,
    pub cancelled: bool,
    pub full_name: String,
    pub tax_id: String,
    pub rg: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub state: String,
    pub salary: Money,
    pub percentage: Percentage,
    /// Always salary × percentage / 100; submitted balances are ignored
    pub balance: Money,
}

/// Cleans a client form.
///
/// ## Example
/// ```rust
/// use convenio_core::forms::{clean_client, RawForm};
///
/// let form = RawForm::new()
///     .with("internal_code", "C-001")
///     .with("full_name", "Ana Souza")
///     .with("tax_id", "123.456.789-01")
///     .with("email", "ana@example.com")
///     .with("city", "Recife")
///     .with("state", "pe")
///     .with("salary", "3000,00")
///     .with("percentage", "30")
///     .with("balance", "999999");
/// let draft = clean_client(&form).unwrap();
/// assert_eq!(draft.tax_id, "12345678901");
/// assert_eq!(draft.balance.cents(), 90_000);
/// ```
pub fn clean_client(form: &RawForm) -> Result<ClientDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::CLIENT);

    let internal_code = c.required_text("internal_code");
    let registration = c.text("registration");
    let cancelled = c.boolean("cancelled");
    let full_name = c.required_text("full_name");
    let tax_id = c.tax_id("tax_id").map(|t| t.into_inner()).unwrap_or_default();
    let rg = c.text("rg");
    let phone = c.text("phone");
    let email = c.email("email").unwrap_or_default();
    let street = c.text("street");
    let postal_code = c.text("postal_code");
    let city = c.required_text("city");
    let state = match c.text("state") {
        Some(raw) => c.check("state", validate_state(c.label("state"), &raw)),
        None => None,
    }
    .unwrap_or_default();

    let salary = c.money("salary").unwrap_or_default();
    let salary = c
        .check("salary", validate_non_negative_money(c.label("salary"), salary))
        .unwrap_or_default();
    let percentage = c.percentage("percentage").unwrap_or_default();
    let balance = compute_client_balance(salary, percentage);

    c.finish(ClientDraft {
        internal_code,
        registration,
        cancelled,
        full_name,
        tax_id,
        rg,
        phone,
        email,
        street,
        postal_code,
        city,
        state,
        salary,
        percentage,
        balance,
    })
}

// =============================================================================
// Company
// =============================================================================

/// A validated company submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDraft {
    pub store_code: String,
    pub tax_id: String,
    pub state_registration: Option<String>,
    pub size: Option<CompanySize>,
    pub situation: CompanySituation,
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
    pub simples_rate: Option<Percentage>,
    pub tax_regime: TaxRegime,
    pub cancelled: bool,
}

pub fn clean_company(form: &RawForm) -> Result<CompanyDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::COMPANY);

    let store_code = c.required_text("store_code");
    let tax_id = c.cnpj("tax_id").map(|t| t.into_inner()).unwrap_or_default();
    let state_registration = c.text("state_registration");
    let size = c.choice("size");
    let situation = c.choice_or_default("situation");
    let opened_on = c.date("opened_on");
    let name = c.required_text("name");
    let legal_name = c.required_text("legal_name");
    let trade_name = c.text("trade_name");
    let contact = c.text("contact");
    let phone = c.text("phone");
    let email = c.email("email");
    let street = c.text("street");
    let number = c.text("number");
    let district = c.text("district");
    let city = c.text("city");
    let state = match c.text("state") {
        Some(raw) => c.check("state", validate_state(c.label("state"), &raw)),
        None => None,
    };
    let postal_code = c.text("postal_code");
    let main_cnae = c.text("main_cnae");
    let simples_rate = c.percentage("simples_rate");
    let tax_regime = c.choice_or_default("tax_regime");
    let cancelled = c.boolean("cancelled");

    c.finish(CompanyDraft {
        store_code,
        tax_id,
        state_registration,
        size,
        situation,
        opened_on,
        name,
        legal_name,
        trade_name,
        contact,
        phone,
        email,
        street,
        number,
        district,
        city,
        state,
        postal_code,
        main_cnae,
        simples_rate,
        tax_regime,
        cancelled,
    })
}

// =============================================================================
// User
// =============================================================================

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A validated user submission.
///
/// `password` holds the submitted plain text until the caller hashes it
/// into `password_hash`; on update both stay empty when the password is
/// left unchanged.
#[derive(Clone, PartialEq)]
pub struct UserDraft {
    pub company_id: Option<String>,
    pub access_level: AccessLevel,
    pub permission: Permission,
    pub name: String,
    pub username: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
    pub cancelled: bool,
}

impl fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDraft")
            .field("company_id", &self.company_id)
            .field("access_level", &self.access_level)
            .field("permission", &self.permission)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

pub fn clean_user(form: &RawForm, ctx: &FormContext) -> Result<UserDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::USER);

    let company_id = c.reference("company_id");
    let access_level = c.choice_or_default("access_level");
    let permission = c.choice_or_default("permission");
    let name = c.required_text("name");
    let username = c.required_text("username");
    let password = c.text("password");
    match (&password, ctx.mode) {
        (None, FormMode::Create) => {
            let err = ValidationError::required(c.label("password"));
            c.reject("password", err);
        }
        (Some(p), _) if p.chars().count() < MIN_PASSWORD_LEN => {
            let err = ValidationError::invalid(
                c.label("password"),
                format!("must have at least {} characters", MIN_PASSWORD_LEN),
            );
            c.reject("password", err);
        }
        _ => {}
    }
    let cancelled = c.boolean("cancelled");

    c.finish(UserDraft {
        company_id,
        access_level,
        permission,
        name,
        username,
        password,
        password_hash: None,
        cancelled,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
