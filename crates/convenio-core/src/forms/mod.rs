//! # Forms
//!
//! Turns a submitted form (field name → raw text) into a typed draft, or
//! into a [`FormErrors`] carrying every problem found.
//!
//! ## Cleaning Flow
//! ```text
//! RawForm ──► Cleaner (schema-driven)
//!               ├── text / money / date / choice / reference readers
//!               │     required + max length from FieldSpec
//!               │     parse failures become field errors
//!               ├── entity rules (validation::*)
//!               └── finish(draft)
//!                     ├── no errors → Ok(draft)
//!                     └── errors    → Err(FormErrors)   (nothing is saved)
//! ```
//!
//! Readers never stop at the first problem: a rejected submission reports
//! all of its field errors at once.

mod agreement;
mod classification;
mod product;
mod registry;

pub use agreement::{
    clean_agreement, clean_opening, clean_sale, AgreementDraft, OpeningDraft, SaleDraft,
};
pub use classification::{
    clean_cest, clean_cfop, clean_classification, clean_cst_cson, clean_ncm, clean_sub_group,
    CestDraft, CfopDraft, ClassificationDraft, CstCsonDraft, NcmDraft, SubGroupDraft,
};
pub use product::{clean_product, ProductDraft};
pub use registry::{clean_client, clean_company, clean_user, ClientDraft, CompanyDraft, UserDraft};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::{DecimalParseError, Money};
use crate::schema::{EntitySchema, FieldSpec};
use crate::types::{Percentage, Quantity, TaxId};
use crate::validation;

// =============================================================================
// Raw form
// =============================================================================

/// A submitted form: field name → raw text.
///
/// Deserializes from url-encoded bodies and from flat JSON objects. JSON
/// numbers become their decimal text, `true` becomes `"true"`; `false` and
/// `null` drop the field (an unchecked checkbox).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawForm(BTreeMap<String, String>);

impl RawForm {
    pub fn new() -> Self {
        RawForm(BTreeMap::new())
    }

    /// Trimmed value; blank counts as missing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder form of [`RawForm::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawForm(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for RawForm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let fields = values
            .into_iter()
            .filter_map(|(name, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(true) => "true".to_string(),
                    serde_json::Value::Bool(false) | serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                Some((name, text))
            })
            .collect();
        Ok(RawForm(fields))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Every error of one rejected submission.
///
/// `fields` maps a field name to its messages; `non_field` holds the
/// form-level messages shown above the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        FormErrors::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn add_error(&mut self, field: impl Into<String>, error: &ValidationError) {
        self.add(field, error.to_string());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages attached to one field.
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
        self.non_field.extend(other.non_field);
    }

    /// A single form-level error.
    pub fn form_level(message: impl Into<String>) -> Self {
        let mut errors = FormErrors::new();
        errors.add_non_field(message);
        errors
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for message in self
            .non_field
            .iter()
            .chain(self.fields.values().flatten())
        {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

// =============================================================================
// Context
// =============================================================================

/// Whether a form creates a record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update,
}

/// Request-scoped facts a cleaner may depend on.
///
/// Passed explicitly; cleaners never read the clock themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormContext {
    pub mode: FormMode,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl FormContext {
    pub fn new(mode: FormMode, now: DateTime<Utc>) -> Self {
        FormContext {
            mode,
            now,
            today: now.date_naive(),
        }
    }

    pub fn time(&self) -> NaiveTime {
        self.now.time()
    }
}

// =============================================================================
// Cleaner
// =============================================================================

/// Schema-driven reader over one submitted form.
///
/// Readers record errors instead of returning them. Readers for required
/// values (`required_*`) return a placeholder when the value is missing or
/// invalid; [`Cleaner::finish`] refuses the draft whenever any error was
/// recorded, so a placeholder never reaches the store.
pub struct Cleaner<'a> {
    form: &'a RawForm,
    schema: &'static EntitySchema,
    errors: FormErrors,
}

impl<'a> Cleaner<'a> {
    pub fn new(form: &'a RawForm, schema: &'static EntitySchema) -> Self {
        Cleaner {
            form,
            schema,
            errors: FormErrors::new(),
        }
    }

    fn spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema.field(name)
    }

    /// Display label of a field.
    pub fn label(&self, name: &str) -> &'static str {
        self.schema.label_of(name)
    }

    /// Raw value; records a "required" error when the schema demands one.
    fn take(&mut self, name: &str) -> Option<&'a str> {
        let value = self.form.get(name);
        if value.is_none() && self.spec(name).map(|s| s.required).unwrap_or(false) {
            let err = ValidationError::required(self.label(name));
            self.reject(name, err);
        }
        value
    }

    fn parsed<T>(&mut self, name: &str, parse: impl FnOnce(&str) -> Result<T, ValidationError>) -> Option<T> {
        let raw = self.take(name)?;
        match parse(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                self.reject(name, err);
                None
            }
        }
    }

    fn decimal_error(&self, name: &str, err: DecimalParseError) -> ValidationError {
        ValidationError::invalid(self.label(name), err.to_string())
    }

    /// Records a message against a field.
    pub fn error(&mut self, name: &str, message: impl Into<String>) {
        self.errors.add(name, message);
    }

    /// Records a validation error against a field.
    pub fn reject(&mut self, name: &str, err: ValidationError) {
        self.errors.add_error(name, &err);
    }

    /// Records a form-level message.
    pub fn non_field(&mut self, message: impl Into<String>) {
        self.errors.add_non_field(message);
    }

    /// Records the error of a failed check, passing successes through.
    pub fn check<T>(&mut self, name: &str, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.reject(name, err);
                None
            }
        }
    }

    pub fn has_error(&self, name: &str) -> bool {
        self.errors.has_field(name)
    }

    /// Raw text of a field as submitted (trimmed), without any checks.
    pub fn raw(&self, name: &str) -> Option<&'a str> {
        self.form.get(name)
    }

    // -------------------------------------------------------------------------
    // Readers
    // -------------------------------------------------------------------------

    /// Optional text, trimmed and length-checked.
    pub fn text(&mut self, name: &str) -> Option<String> {
        let max = self.spec(name).and_then(|s| s.max_len);
        let label = self.label(name);
        self.parsed(name, |raw| {
            if let Some(max) = max {
                validation::validate_max_len(label, raw, max)?;
            }
            Ok(raw.to_string())
        })
    }

    /// Required text; empty placeholder when missing.
    pub fn required_text(&mut self, name: &str) -> String {
        let value = self.text(name);
        if value.is_none() && !self.has_error(name) {
            let err = ValidationError::required(self.label(name));
            self.reject(name, err);
        }
        value.unwrap_or_default()
    }

    /// Digits-only text (punctuation stripped), length-checked on the digits.
    pub fn digits(&mut self, name: &str) -> Option<String> {
        let max = self.spec(name).and_then(|s| s.max_len);
        let label = self.label(name);
        self.parsed(name, |raw| {
            let digits = TaxId::digits(raw);
            if digits.is_empty() {
                return Err(ValidationError::invalid(label, "must contain digits"));
            }
            if let Some(max) = max {
                validation::validate_max_len(label, &digits, max)?;
            }
            Ok(digits)
        })
    }

    /// CPF or CNPJ, normalized to digits.
    pub fn tax_id(&mut self, name: &str) -> Option<TaxId> {
        let label = self.label(name);
        self.parsed(name, |raw| TaxId::parse(raw).map_err(|e| relabel(e, label)))
    }

    /// CNPJ only, normalized to digits.
    pub fn cnpj(&mut self, name: &str) -> Option<TaxId> {
        let label = self.label(name);
        self.parsed(name, |raw| TaxId::parse_cnpj(raw).map_err(|e| relabel(e, label)))
    }

    pub fn email(&mut self, name: &str) -> Option<String> {
        let label = self.label(name);
        let value = self.text(name)?;
        self.check(name, validation::validate_email(label, &value))
    }

    pub fn money(&mut self, name: &str) -> Option<Money> {
        let raw = self.take(name)?;
        match raw.parse::<Money>() {
            Ok(value) => Some(value),
            Err(err) => {
                let err = self.decimal_error(name, err);
                self.reject(name, err);
                None
            }
        }
    }

    /// A percentage between 0 and 100.
    pub fn percentage(&mut self, name: &str) -> Option<Percentage> {
        let raw = self.take(name)?;
        let label = self.label(name);
        match raw.parse::<Percentage>() {
            Ok(pct) => self.check(name, validation::validate_percentage(label, pct)),
            Err(err) => {
                let err = self.decimal_error(name, err);
                self.reject(name, err);
                None
            }
        }
    }

    /// A non-negative quantity with up to three decimals.
    pub fn quantity(&mut self, name: &str) -> Option<Quantity> {
        let raw = self.take(name)?;
        match raw.parse::<Quantity>() {
            Ok(qty) if qty.thousandths() < 0 => {
                let err = ValidationError::OutOfRange {
                    field: self.label(name).to_string(),
                    min: 0,
                    max: i64::MAX,
                };
                self.reject(name, err);
                None
            }
            Ok(qty) => Some(qty),
            Err(err) => {
                let err = self.decimal_error(name, err);
                self.reject(name, err);
                None
            }
        }
    }

    pub fn integer(&mut self, name: &str) -> Option<i64> {
        let label = self.label(name);
        self.parsed(name, |raw| {
            raw.parse::<i64>()
                .map_err(|_| ValidationError::invalid(label, "must be a whole number"))
        })
    }

    /// Checkbox semantics: missing means false.
    pub fn boolean(&self, name: &str) -> bool {
        matches!(
            self.form.get(name).map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "true" | "1" | "yes" | "sim")
        )
    }

    /// `YYYY-MM-DD` or `DD/MM/YYYY`.
    pub fn date(&mut self, name: &str) -> Option<NaiveDate> {
        let label = self.label(name);
        self.parsed(name, |raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
                .map_err(|_| ValidationError::invalid(label, "enter a valid date"))
        })
    }

    /// `HH:MM` or `HH:MM:SS`.
    pub fn time(&mut self, name: &str) -> Option<NaiveTime> {
        let label = self.label(name);
        self.parsed(name, |raw| {
            NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .map_err(|_| ValidationError::invalid(label, "enter a valid time"))
        })
    }

    /// A coded enum, by code or label.
    pub fn choice<E>(&mut self, name: &str) -> Option<E>
    where
        E: FromStr<Err = ValidationError>,
    {
        let label = self.label(name);
        self.parsed(name, |raw| raw.parse::<E>().map_err(|e| relabel(e, label)))
    }

    /// A coded enum, falling back to its default when not submitted.
    pub fn choice_or_default<E>(&mut self, name: &str) -> E
    where
        E: FromStr<Err = ValidationError> + Default,
    {
        self.choice(name).unwrap_or_default()
    }

    /// Identifier of a referenced record (UUID shape only; existence is the
    /// store's foreign keys' concern).
    pub fn reference(&mut self, name: &str) -> Option<String> {
        let label = self.label(name);
        self.parsed(name, |raw| validation::validate_uuid(label, raw))
    }

    /// Required reference; empty placeholder when missing.
    pub fn required_reference(&mut self, name: &str) -> String {
        let value = self.reference(name);
        if value.is_none() && !self.has_error(name) {
            let err = ValidationError::required(self.label(name));
            self.reject(name, err);
        }
        value.unwrap_or_default()
    }

    /// Accepts the draft only when nothing was recorded.
    pub fn finish<D>(self, draft: D) -> Result<D, FormErrors> {
        if self.errors.is_empty() {
            Ok(draft)
        } else {
            Err(self.errors)
        }
    }
}

/// Puts the display label into an error raised by a value type.
fn relabel(err: ValidationError, label: &str) -> ValidationError {
    let field = label.to_string();
    match err {
        ValidationError::Required { .. } => ValidationError::Required { field },
        ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
        ValidationError::OutOfRange { min, max, .. } => ValidationError::OutOfRange { field, min, max },
        ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat { field, reason },
        ValidationError::NotAllowed { allowed, .. } => ValidationError::NotAllowed { field, allowed },
        ValidationError::DateBefore { other, .. } => ValidationError::DateBefore { field, other },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::types::CompanySize;

    #[test]
    fn test_raw_form_treats_blank_as_missing() {
        let form = RawForm::new().with("name", "   ").with("city", " Recife ");
        assert_eq!(form.get("name"), None);
        assert_eq!(form.get("city"), Some("Recife"));
    }

    #[test]
    fn test_raw_form_from_json() {
        let form: RawForm =
            serde_json::from_str(r#"{"value": 150.5, "active": true, "weighed": false, "name": "X"}"#).unwrap();
        assert_eq!(form.get("value"), Some("150.5"));
        assert_eq!(form.get("active"), Some("true"));
        assert_eq!(form.get("weighed"), None);
    }

    #[test]
    fn test_required_and_length() {
        let long = "x".repeat(151);
        let form = RawForm::new().with("full_name", long.as_str());
        let mut cleaner = Cleaner::new(&form, &schema::CLIENT);
        cleaner.required_text("full_name");
        cleaner.required_text("city");
        let errors = cleaner.finish(()).unwrap_err();
        assert_eq!(errors.messages("full_name"), ["Full name must be at most 150 characters"]);
        assert_eq!(errors.messages("city"), ["City is required"]);
    }

    #[test]
    fn test_checkbox_semantics() {
        let form = RawForm::new().with("cancelled", "on");
        let cleaner = Cleaner::new(&form, &schema::CLIENT);
        assert!(cleaner.boolean("cancelled"));
        assert!(!cleaner.boolean("missing"));
    }

    #[test]
    fn test_choice_errors_use_label() {
        let form = RawForm::new().with("size", "Huge");
        let mut cleaner = Cleaner::new(&form, &schema::COMPANY);
        assert_eq!(cleaner.choice::<CompanySize>("size"), None);
        let errors = cleaner.finish(()).unwrap_err();
        assert_eq!(errors.messages("size"), ["Size must be one of: MEI, ME, EPP, Outros"]);
    }

    #[test]
    fn test_dates_in_both_formats() {
        let form = RawForm::new()
            .with("opened_on", "2025-07-01")
            .with("closed_on", "31/07/2025")
            .with("paid_on", "2025-13-01");
        let mut cleaner = Cleaner::new(&form, &schema::AGREEMENT_OPENING);
        assert_eq!(cleaner.date("opened_on"), NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(cleaner.date("closed_on"), NaiveDate::from_ymd_opt(2025, 7, 31));
        assert_eq!(cleaner.date("paid_on"), None);
        assert!(cleaner.has_error("paid_on"));
    }

    #[test]
    fn test_form_errors_display_and_merge() {
        let mut a = FormErrors::form_level("Inconsistent client");
        let mut b = FormErrors::new();
        b.add("value", "Value must be greater than zero");
        a.merge(b);
        assert!(a.has_field("value"));
        assert_eq!(a.to_string(), "Inconsistent client; Value must be greater than zero");
    }
}
