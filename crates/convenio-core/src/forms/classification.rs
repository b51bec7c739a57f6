//! Product classification forms: sectors, categories, groups, sub-groups
//! and the fiscal code tables.

use chrono::NaiveDate;

use super::{Cleaner, FormErrors, RawForm};
use crate::schema::{self, EntitySchema};
use crate::types::{RecordStatus, TaxRegime};
use crate::validation::{
    validate_cest, validate_cfop, validate_cst_cson, validate_cst_regime, validate_date_order,
};

/// A validated sector, category or group submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDraft {
    pub code: String,
    pub description: String,
    pub cancelled: bool,
}

/// Cleans a sector, category or group form (they share one shape).
pub fn clean_classification(
    form: &RawForm,
    schema: &'static EntitySchema,
) -> Result<ClassificationDraft, FormErrors> {
    let mut c = Cleaner::new(form, schema);
    let code = c.required_text("code");
    let description = c.required_text("description");
    let cancelled = c.boolean("cancelled");
    c.finish(ClassificationDraft {
        code,
        description,
        cancelled,
    })
}

/// A validated sub-group submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGroupDraft {
    pub group_id: String,
    pub name: String,
    pub status: RecordStatus,
}

pub fn clean_sub_group(form: &RawForm) -> Result<SubGroupDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::SUB_GROUP);
    let group_id = c.required_reference("group_id");
    let name = c.required_text("name");
    let status = c.choice_or_default("status");
    c.finish(SubGroupDraft {
        group_id,
        name,
        status,
    })
}

/// A validated NCM submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcmDraft {
    pub code: String,
    pub description: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub year: Option<String>,
    pub number: Option<String>,
    pub segment: Option<String>,
    pub cancelled: bool,
}

pub fn clean_ncm(form: &RawForm) -> Result<NcmDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::NCM);
    let code = c.digits("code").unwrap_or_default();
    let description = c.required_text("description");
    let valid_from = c.date("valid_from");
    let valid_until = c.date("valid_until");
    if let (Some(from), Some(until)) = (valid_from, valid_until) {
        let check = validate_date_order(c.label("valid_until"), until, c.label("valid_from"), from);
        c.check("valid_until", check);
    }
    let year = c.digits("year");
    let number = c.text("number");
    let segment = c.text("segment");
    let cancelled = c.boolean("cancelled");
    c.finish(NcmDraft {
        code,
        description,
        valid_from,
        valid_until,
        year,
        number,
        segment,
        cancelled,
    })
}

/// A validated CFOP submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfopDraft {
    pub code: String,
    pub category: String,
    pub description: String,
    pub cancelled: bool,
}

pub fn clean_cfop(form: &RawForm) -> Result<CfopDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::CFOP);
    let code = match c.text("code") {
        Some(raw) => c.check("code", validate_cfop(c.label("code"), &raw)),
        None => None,
    }
    .unwrap_or_default();
    let category = c.required_text("category");
    let description = c.required_text("description");
    let cancelled = c.boolean("cancelled");
    c.finish(CfopDraft {
        code,
        category,
        description,
        cancelled,
    })
}

/// A validated CEST submission; `code` is digits only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CestDraft {
    pub code: String,
    pub description: String,
    pub ncm_code: Option<String>,
    pub cancelled: bool,
}

pub fn clean_cest(form: &RawForm) -> Result<CestDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::CEST);
    // punctuated input ("01.001.00") is longer than the digit limit, so the
    // raw value skips the generic length check
    let code = match c.raw("code") {
        Some(raw) => c.check("code", validate_cest(c.label("code"), raw)),
        None => {
            c.required_text("code");
            None
        }
    }
    .unwrap_or_default();
    let description = c.required_text("description");
    let ncm_code = c.text("ncm_code");
    let cancelled = c.boolean("cancelled");
    c.finish(CestDraft {
        code,
        description,
        ncm_code,
        cancelled,
    })
}

/// A validated CST/CSOSN submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstCsonDraft {
    pub code: String,
    pub description: String,
    pub regime: TaxRegime,
    pub cancelled: bool,
}

pub fn clean_cst_cson(form: &RawForm) -> Result<CstCsonDraft, FormErrors> {
    let mut c = Cleaner::new(form, &schema::CST_CSON);
    let code = match c.raw("code") {
        Some(raw) => c.check("code", validate_cst_cson(c.label("code"), raw)),
        None => {
            c.required_text("code");
            None
        }
    }
    .unwrap_or_default();
    let description = c.required_text("description");
    let regime = match c.choice::<TaxRegime>("regime") {
        Some(regime) => c.check("regime", validate_cst_regime(c.label("regime"), regime)),
        None => None,
    }
    .unwrap_or_default();
    let cancelled = c.boolean("cancelled");
    c.finish(CstCsonDraft {
        code,
        description,
        regime,
        cancelled,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_shared_shape() {
        let form = RawForm::new().with("code", "01").with("description", "Bebidas");
        for schema in [&schema::SECTOR, &schema::CATEGORY, &schema::GROUP] {
            let draft = clean_classification(&form, schema).unwrap();
            assert_eq!(draft.code, "01");
            assert!(!draft.cancelled);
        }
        assert!(clean_classification(&RawForm::new(), &schema::SECTOR)
            .unwrap_err()
            .has_field("description"));
    }

    #[test]
    fn test_sub_group_needs_group() {
        let errors = clean_sub_group(&RawForm::new().with("name", "Refrigerantes")).unwrap_err();
        assert_eq!(errors.messages("group_id"), ["Group is required"]);
    }

    #[test]
    fn test_ncm_validity_order() {
        let form = RawForm::new()
            .with("code", "2202.10.00")
            .with("description", "Águas")
            .with("valid_from", "2025-01-01")
            .with("valid_until", "2024-12-31");
        let errors = clean_ncm(&form).unwrap_err();
        assert_eq!(errors.messages("valid_until"), ["Valid until cannot be before Valid from"]);

        let draft = clean_ncm(&form.with("valid_until", "2025-12-31")).unwrap();
        assert_eq!(draft.code, "22021000");
    }

    #[test]
    fn test_cfop_exactly_four_digits() {
        let form = RawForm::new()
            .with("category", "Saídas")
            .with("description", "Venda de mercadoria");
        assert_eq!(clean_cfop(&form.clone().with("code", "5102")).unwrap().code, "5102");
        assert!(clean_cfop(&form.clone().with("code", "510")).is_err());
        assert!(clean_cfop(&form.with("code", "51020")).is_err());
    }

    #[test]
    fn test_cest_strips_punctuation() {
        let form = RawForm::new().with("description", "Sorvetes");
        assert_eq!(clean_cest(&form.clone().with("code", "23.001.00")).unwrap().code, "2300100");
        assert!(clean_cest(&form.clone().with("code", "230010")).is_err());
        assert_eq!(
            clean_cest(&form).unwrap_err().messages("code"),
            ["CEST is required"]
        );
    }

    #[test]
    fn test_cst_cson_code_and_regime() {
        let form = RawForm::new()
            .with("code", "102")
            .with("description", "Tributada sem permissão de crédito")
            .with("regime", "1");
        assert_eq!(clean_cst_cson(&form).unwrap().regime, TaxRegime::SimplesNacional);

        let errors = clean_cst_cson(&form.clone().with("regime", "2")).unwrap_err();
        assert_eq!(errors.messages("regime"), ["Regime must be one of: 1, 3"]);

        assert!(clean_cst_cson(&form.with("code", "1a2")).unwrap_err().has_field("code"));
    }
}
