//! Agreement, opening-period and sale forms.

use chrono::{Datelike, NaiveDate, NaiveTime};

use super::{Cleaner, FormContext, FormErrors, RawForm};
use crate::catalog::Issuance;
use crate::money::Money;
use crate::schema;
use crate::types::{OpeningStatus, ReferenceMonth};
use crate::validation::{
    validate_date_order, validate_opening_month, validate_installment_count, validate_positive_money,
};

// =============================================================================
// Agreement
// =============================================================================

/// A validated agreement submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementDraft {
    pub store_code: Option<i64>,
    pub name: String,
    pub tax_id: String,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub max_installments: i32,
    pub event_code: Option<String>,
    pub logo_ref: Option<String>,
}

pub fn clean_agreement(form: &RawForm) -> Result<AgreementDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::AGREEMENT);

    let store_code = c.integer("store_code");
    let name = c.required_text("name");
    let tax_id = c.cnpj("tax_id").map(|t| t.into_inner()).unwrap_or_default();
    let contact = c.text("contact");
    let email = c.email("email");
    let phone = c.text("phone");
    let active = c.boolean("active");
    let max_installments = match c.integer("max_installments") {
        Some(n) => c.check(
            "max_installments",
            validate_installment_count(c.label("max_installments"), n),
        ),
        None => None,
    }
    .unwrap_or(1);
    let event_code = c.text("event_code");
    let logo_ref = c.text("logo_ref");

    c.finish(AgreementDraft {
        store_code,
        name,
        tax_id,
        contact,
        email,
        phone,
        active,
        max_installments,
        event_code,
        logo_ref,
    })
}

// =============================================================================
// Agreement opening
// =============================================================================

/// A validated opening-period submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningDraft {
    pub reference_month: ReferenceMonth,
    pub status: OpeningStatus,
    pub opened_on: NaiveDate,
    pub closed_on: Option<NaiveDate>,
    pub paid_on: Option<NaiveDate>,
}

/// Cleans an opening-period form.
///
/// ## Rules
/// - Reference month `MM/AAAA`, year in `[1900, current year + 50]`
/// - Closing and payment dates may not precede the opening date
pub fn clean_opening(form: &RawForm, ctx: &FormContext) -> Result<OpeningDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::AGREEMENT_OPENING);
    let current_year = ctx.today.year();

    let reference_month = match c.text("reference_month") {
        Some(raw) => c.check("reference_month", validate_opening_month(&raw, current_year)),
        None => None,
    };
    let status = c.choice_or_default("status");
    let opened_on = c.date("opened_on");
    let closed_on = c.date("closed_on");
    let paid_on = c.date("paid_on");

    if let Some(opened) = opened_on {
        let opened_label = c.label("opened_on");
        if let Some(closed) = closed_on {
            let check = validate_date_order(c.label("closed_on"), closed, opened_label, opened);
            c.check("closed_on", check);
        }
        if let Some(paid) = paid_on {
            let check = validate_date_order(c.label("paid_on"), paid, opened_label, opened);
            c.check("paid_on", check);
        }
    }

    let placeholder = ReferenceMonth::containing(ctx.today);
    c.finish(OpeningDraft {
        reference_month: reference_month.unwrap_or(placeholder),
        status,
        opened_on: opened_on.unwrap_or(ctx.today),
        closed_on,
        paid_on,
    })
}

// =============================================================================
// Sale
// =============================================================================

/// A validated sale submission.
///
/// `client_id` and `agreement_id` always come from the referenced issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    pub user_id: String,
    pub issuance_id: String,
    pub client_id: String,
    pub agreement_id: String,
    pub sale_date: NaiveDate,
    pub sale_time: NaiveTime,
    pub value: Money,
    pub installments: i32,
}

/// Cleans a sale form against the issuance it references.
///
/// `issuance` is the record `issuance_id` resolved to, if any. Date and time
/// default to the request time; value and installment count default to the
/// issuance's.
pub fn clean_sale(
    form: &RawForm,
    ctx: &FormContext,
    issuance: Option<&Issuance>,
) -> Result<SaleDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::SALE);

    let user_id = c.required_reference("user_id");
    let issuance_id = c.required_reference("issuance_id");
    if !issuance_id.is_empty() && issuance.is_none() {
        c.error("issuance_id", "Issuance not found");
    }

    let sale_date = c.date("sale_date").unwrap_or(ctx.today);
    let sale_time = c.time("sale_time").unwrap_or_else(|| ctx.time());

    let value = match c.money("value").or_else(|| issuance.map(Issuance::value)) {
        Some(value) => c.check("value", validate_positive_money(c.label("value"), value)),
        None => None,
    }
    .unwrap_or_default();

    let installments = match c
        .integer("installments")
        .or_else(|| issuance.map(|i| i64::from(i.installments)))
    {
        Some(n) => c.check(
            "installments",
            validate_installment_count(c.label("installments"), n),
        ),
        None => None,
    }
    .unwrap_or_default();

    let (client_id, agreement_id) = issuance
        .map(|i| (i.client_id.clone(), i.agreement_id.clone()))
        .unwrap_or_default();

    c.finish(SaleDraft {
        user_id,
        issuance_id,
        client_id,
        agreement_id,
        sale_date,
        sale_time,
        value,
        installments,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormMode;
    use chrono::{TimeZone, Utc};

    fn ctx() -> FormContext {
        FormContext::new(
            FormMode::Create,
            Utc.with_ymd_and_hms(2025, 7, 15, 14, 30, 0).unwrap(),
        )
    }

    fn issuance() -> Issuance {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();
        Issuance {
            id: "7d4f3a56-0c1e-4b8e-9a55-2f7f3c1d9e01".to_string(),
            tax_id: "12345678901".to_string(),
            client_id: "c5d1c8a2-6e0b-4f7a-8c3d-1b2a3c4d5e6f".to_string(),
            client_name: "Ana Souza".to_string(),
            balance_snapshot_cents: 90_000,
            reference_month: "072025".to_string(),
            agreement_id: "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d".to_string(),
            agreement_name: "Prefeitura".to_string(),
            installments: 3,
            value_cents: 30_000,
            transaction_date: now.date_naive(),
            transaction_time: now.time(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_agreement_max_installments() {
        let form = RawForm::new()
            .with("name", "Prefeitura")
            .with("tax_id", "12.345.678/0001-90");
        assert_eq!(clean_agreement(&form).unwrap().max_installments, 1);

        let errors = clean_agreement(&form.clone().with("max_installments", "0")).unwrap_err();
        assert_eq!(
            errors.messages("max_installments"),
            ["Maximum installments must be greater than zero"]
        );
        let errors =
            clean_agreement(&form.clone().with("max_installments", "2147483647")).unwrap_err();
        assert_eq!(
            errors.messages("max_installments"),
            ["Maximum installments must be between 1 and 360"]
        );
        assert_eq!(
            clean_agreement(&form.with("max_installments", "12")).unwrap().max_installments,
            12
        );
    }

    #[test]
    fn test_opening_dates_and_month() {
        let form = RawForm::new()
            .with("reference_month", "07/2025")
            .with("status", "A")
            .with("opened_on", "2025-07-01")
            .with("closed_on", "2025-06-30")
            .with("paid_on", "2025-06-01");
        let errors = clean_opening(&form, &ctx()).unwrap_err();
        assert_eq!(errors.messages("closed_on"), ["Closing date cannot be before Opening date"]);
        assert_eq!(errors.messages("paid_on"), ["Payment date cannot be before Opening date"]);

        let form = form
            .with("closed_on", "2025-07-31")
            .with("paid_on", "2025-08-10");
        let draft = clean_opening(&form, &ctx()).unwrap();
        assert_eq!(draft.reference_month.display(), "07/2025");

        let far = form.with("reference_month", "01/2076");
        assert!(clean_opening(&far, &ctx()).unwrap_err().has_field("reference_month"));
    }

    #[test]
    fn test_sale_defaults_from_issuance() {
        let issuance = issuance();
        let form = RawForm::new()
            .with("user_id", "0f9e8d7c-6b5a-4c3d-8e2f-1a0b9c8d7e6f")
            .with("issuance_id", issuance.id.as_str())
            .with("client_id", "ffffffff-ffff-4fff-8fff-ffffffffffff");
        let draft = clean_sale(&form, &ctx(), Some(&issuance)).unwrap();
        assert_eq!(draft.client_id, issuance.client_id);
        assert_eq!(draft.agreement_id, issuance.agreement_id);
        assert_eq!(draft.value.cents(), 30_000);
        assert_eq!(draft.installments, 3);
        assert_eq!(draft.sale_date, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        assert_eq!(draft.sale_time, NaiveTime::from_hms_opt(14, 30, 0).unwrap());
    }

    #[test]
    fn test_sale_rejects_non_positive_values() {
        let issuance = issuance();
        let form = RawForm::new()
            .with("user_id", "0f9e8d7c-6b5a-4c3d-8e2f-1a0b9c8d7e6f")
            .with("issuance_id", issuance.id.as_str())
            .with("value", "0")
            .with("installments", "-1");
        let errors = clean_sale(&form, &ctx(), Some(&issuance)).unwrap_err();
        assert!(errors.has_field("value"));
        assert!(errors.has_field("installments"));
    }

    #[test]
    fn test_sale_with_unknown_issuance() {
        let form = RawForm::new()
            .with("user_id", "0f9e8d7c-6b5a-4c3d-8e2f-1a0b9c8d7e6f")
            .with("issuance_id", "7d4f3a56-0c1e-4b8e-9a55-2f7f3c1d9e01");
        let errors = clean_sale(&form, &ctx(), None).unwrap_err();
        assert_eq!(errors.messages("issuance_id"), ["Issuance not found"]);
    }
}
