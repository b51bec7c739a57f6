//! # Value Types
//!
//! Small value types shared by the entity catalog, the validators and the
//! persistence layer: percentages, quantities, tax IDs, reference months and
//! the coded enums every choice field uses.
//!
//! ## Storage Conventions
//! ```text
//! ┌──────────────────┬───────────────────────┬────────────────────────────┐
//! │ Concept          │ Stored as             │ Displayed as               │
//! ├──────────────────┼───────────────────────┼────────────────────────────┤
//! │ Money            │ i64 centavos          │ R$ 1234.56                 │
//! │ Percentage       │ i64 hundredths of 1%  │ 12.50                      │
//! │ Quantity/weight  │ i64 thousandths       │ 1.500                      │
//! │ Tax ID           │ digits only           │ 123.456.789-01             │
//! │ Reference month  │ MMYYYY (issuance)     │ MM/YYYY                    │
//! │ Choice fields    │ legacy one/two letter │ label ("Ativa", "Pago")    │
//! │                  │ codes ("A", "1", "UN")│                            │
//! └──────────────────┴───────────────────────┴────────────────────────────┘
//! ```

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{format_scaled, parse_scaled, DecimalParseError};

// =============================================================================
// Percentage
// =============================================================================

/// A percentage with two decimal places, stored as hundredths of a percent.
///
/// ## Examples
/// - 10000 hundredths = 100.00%
/// - 1250 hundredths = 12.50%
/// - 1 hundredth = 0.01%
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(i64);

impl Percentage {
    /// 100.00%
    pub const FULL: Percentage = Percentage(10_000);

    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Percentage(hundredths)
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// True for 0.00% through 100.00% inclusive.
    pub const fn is_within_full_range(&self) -> bool {
        self.0 >= 0 && self.0 <= Self::FULL.0
    }
}

impl FromStr for Percentage {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s.trim().trim_end_matches('%'), 2).map(Percentage)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_scaled(self.0, 2))
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A quantity or weight with three decimal places, stored as thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Exactly one unit.
    pub const ONE: Quantity = Quantity(1000);

    #[inline]
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Quantity(thousandths)
    }

    #[inline]
    pub const fn thousandths(&self) -> i64 {
        self.0
    }
}

impl FromStr for Quantity {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, 3).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_scaled(self.0, 3))
    }
}

// =============================================================================
// Tax ID (CPF / CNPJ)
// =============================================================================

/// Which kind of Brazilian tax identifier a digit string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdKind {
    /// Individual (11 digits)
    Cpf,
    /// Company (14 digits)
    Cnpj,
}

/// A tax ID normalized to its digits.
///
/// ## Normalization
/// ```text
/// "123.456.789-01"      → "12345678901"     (CPF)
/// "12.345.678/0001-90"  → "12345678000190"  (CNPJ)
/// ```
/// Lookups and uniqueness always work on the normalized form; punctuation
/// only comes back through [`TaxId::formatted`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxId(String);

impl TaxId {
    /// Strips every non-digit character.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::types::TaxId;
    ///
    /// assert_eq!(TaxId::digits(" 123.456.789-01 "), "12345678901");
    /// assert_eq!(TaxId::digits("abc"), "");
    /// ```
    pub fn digits(raw: &str) -> String {
        raw.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Parses a CPF or CNPJ (11 or 14 digits after normalization).
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits = Self::digits(raw);
        match digits.len() {
            0 => Err(ValidationError::required("tax_id")),
            11 | 14 => Ok(TaxId(digits)),
            n => Err(ValidationError::invalid(
                "tax_id",
                format!("expected 11 (CPF) or 14 (CNPJ) digits, got {}", n),
            )),
        }
    }

    /// Parses a company tax ID (exactly 14 digits).
    pub fn parse_cnpj(raw: &str) -> Result<Self, ValidationError> {
        let digits = Self::digits(raw);
        match digits.len() {
            0 => Err(ValidationError::required("tax_id")),
            14 => Ok(TaxId(digits)),
            n => Err(ValidationError::invalid(
                "tax_id",
                format!("expected 14 digits, got {}", n),
            )),
        }
    }

    /// Wraps an already-normalized value read back from storage.
    pub fn from_stored(digits: impl Into<String>) -> Self {
        TaxId(digits.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn kind(&self) -> Option<TaxIdKind> {
        match self.0.len() {
            11 => Some(TaxIdKind::Cpf),
            14 => Some(TaxIdKind::Cnpj),
            _ => None,
        }
    }

    /// Display form with the usual punctuation.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::types::TaxId;
    ///
    /// let cpf = TaxId::parse("12345678901").unwrap();
    /// assert_eq!(cpf.formatted(), "123.456.789-01");
    ///
    /// let cnpj = TaxId::parse("12345678000190").unwrap();
    /// assert_eq!(cnpj.formatted(), "12.345.678/0001-90");
    /// ```
    pub fn formatted(&self) -> String {
        let d = &self.0;
        match self.kind() {
            Some(TaxIdKind::Cpf) => {
                format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
            }
            Some(TaxIdKind::Cnpj) => format!(
                "{}.{}.{}/{}-{}",
                &d[0..2],
                &d[2..5],
                &d[5..8],
                &d[8..12],
                &d[12..14]
            ),
            None => d.clone(),
        }
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

// =============================================================================
// Reference Month
// =============================================================================

/// Lowest year accepted in any reference month.
pub const REFERENCE_YEAR_MIN: i32 = 1900;

/// Highest year accepted in an issuance reference month.
pub const ISSUANCE_YEAR_MAX: i32 = 2100;

/// How far past the current year an opening period may be declared.
pub const OPENING_YEARS_AHEAD: i32 = 50;

/// A billing period: month and year.
///
/// ## Forms
/// ```text
/// display  "07/2025"   ← what users type and see
/// storage  "072025"    ← issuance.reference_month
/// sort key 202507      ← chronological ordering
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReferenceMonth {
    month: u32,
    year: i32,
}

impl ReferenceMonth {
    /// Builds a reference month, checking month ∈ [1,12] and the year range.
    pub fn new(month: u32, year: i32, year_min: i32, year_max: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::invalid(
                "reference_month",
                "month must be between 01 and 12",
            ));
        }
        if year < year_min || year > year_max {
            return Err(ValidationError::invalid(
                "reference_month",
                format!("year must be between {} and {}", year_min, year_max),
            ));
        }
        Ok(ReferenceMonth { month, year })
    }

    /// Parses the display form `MM/AAAA`.
    ///
    /// Exactly two month digits, a slash and four year digits; nothing else.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::types::ReferenceMonth;
    ///
    /// let month = ReferenceMonth::parse_display("07/2025", 1900, 2100).unwrap();
    /// assert_eq!(month.storage_code(), "072025");
    /// assert!(ReferenceMonth::parse_display("13/2025", 1900, 2100).is_err());
    /// assert!(ReferenceMonth::parse_display("7/2025", 1900, 2100).is_err());
    /// ```
    pub fn parse_display(raw: &str, year_min: i32, year_max: i32) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let (mm, yyyy) = raw.split_once('/').ok_or_else(|| {
            ValidationError::invalid("reference_month", "use the format MM/AAAA")
        })?;
        Self::from_parts(mm, yyyy, year_min, year_max)
    }

    /// Parses the 6-digit storage form `MMYYYY`.
    pub fn parse_storage(raw: &str, year_min: i32, year_max: i32) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.is_ascii() {
            return Err(ValidationError::invalid(
                "reference_month",
                "use the format MMAAAA",
            ));
        }
        let (mm, yyyy) = raw.split_at(2);
        Self::from_parts(mm, yyyy, year_min, year_max)
    }

    fn from_parts(mm: &str, yyyy: &str, year_min: i32, year_max: i32) -> Result<Self, ValidationError> {
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if mm.len() != 2 || yyyy.len() != 4 || !all_digits(mm) || !all_digits(yyyy) {
            return Err(ValidationError::invalid(
                "reference_month",
                "month must have 2 digits and year 4 digits",
            ));
        }
        let month: u32 = mm
            .parse()
            .map_err(|_| ValidationError::invalid("reference_month", "invalid month"))?;
        let year: i32 = yyyy
            .parse()
            .map_err(|_| ValidationError::invalid("reference_month", "invalid year"))?;
        Self::new(month, year, year_min, year_max)
    }

    pub const fn month(&self) -> u32 {
        self.month
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    /// `MMYYYY`, the issuance storage form.
    pub fn storage_code(&self) -> String {
        format!("{:02}{:04}", self.month, self.year)
    }

    /// `MM/YYYY`, the display form.
    pub fn display(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }

    /// Last calendar day of the month `offset` months after this one.
    pub fn last_day_after(&self, offset: u32) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let next_first = first.checked_add_months(Months::new(offset + 1))?;
        next_first.pred_opt()
    }

    /// The reference month containing a date.
    pub fn containing(date: NaiveDate) -> Self {
        ReferenceMonth {
            month: date.month(),
            year: date.year(),
        }
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

// =============================================================================
// Coded Enums
// =============================================================================

/// Declares a choice enum backed by the legacy one/two letter codes.
///
/// Each enum gets the same surface: `code()`, `label()`, `ALL`, `CHOICES`
/// (for the field schema), `Default`, `Display` (the code) and a `FromStr`
/// that accepts either the code or the label, case-insensitively. With the
/// `sqlx` feature the code is also the database representation.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = ($code:literal, $label:literal), )+
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[ts(export)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[cfg_attr(feature = "sqlx", sqlx(rename = $code))]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// `(code, label)` pairs for choice widgets.
            pub const CHOICES: &'static [(&'static str, &'static str)] = &[$(($code, $label)),+];

            /// Storage code.
            pub const fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Human-readable label.
            pub const fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code().eq_ignore_ascii_case(s) || v.label().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ValidationError::NotAllowed {
                        field: stringify!($name).to_string(),
                        allowed: $name::CHOICES.iter().map(|(code, _)| code.to_string()).collect(),
                    })
            }
        }
    };
}

coded_enum! {
    /// Company tax regime (CRT).
    pub enum TaxRegime {
        SimplesNacional = ("1", "Simples Nacional"),
        SimplesExcessoSublimite = ("2", "Simples Nacional - excesso de sublimite"),
        RegimeNormal = ("3", "Regime Normal"),
    }
    default = SimplesNacional;
}

coded_enum! {
    /// Company size bracket.
    pub enum CompanySize {
        Mei = ("MEI", "Microempreendedor Individual"),
        Me = ("ME", "Microempresa"),
        Epp = ("EPP", "Empresa de Pequeno Porte"),
        Other = ("Outros", "Outros"),
    }
    default = Me;
}

coded_enum! {
    /// Registration situation of a company.
    pub enum CompanySituation {
        Active = ("Ativa", "Ativa"),
        Inactive = ("Inativa", "Inativa"),
        Suspended = ("Suspensa", "Suspensa"),
        Closed = ("Baixada", "Baixada"),
    }
    default = Active;
}

coded_enum! {
    /// Back-office access level of a user.
    pub enum AccessLevel {
        Admin = ("Admin", "Administrador"),
        Manager = ("Gerente", "Gerente"),
        Operator = ("Operador", "Operador"),
        Viewer = ("Visualizador", "Visualizador"),
    }
    default = Operator;
}

coded_enum! {
    /// Permission breadth of a user.
    pub enum Permission {
        Full = ("Total", "Total"),
        Partial = ("Parcial", "Parcial"),
        NoAccess = ("Nenhum", "Nenhum"),
    }
    default = Partial;
}

coded_enum! {
    /// Active/cancelled flag stored as a letter (sub-groups).
    pub enum RecordStatus {
        Active = ("A", "Ativo"),
        Cancelled = ("C", "Cancelado"),
    }
    default = Active;
}

coded_enum! {
    /// Unit a product is sold by.
    pub enum SaleUnit {
        Unit = ("UN", "Unidade"),
        Kilogram = ("KG", "Quilograma"),
        Liter = ("LT", "Litro"),
        Meter = ("MT", "Metro"),
        Piece = ("PC", "Peça"),
    }
    default = Unit;
}

coded_enum! {
    /// Goods for sale or a service.
    pub enum ProductKind {
        Goods = ("V", "Venda"),
        Service = ("S", "Serviço"),
    }
    default = Goods;
}

coded_enum! {
    /// Whether a product can currently be sold.
    pub enum ProductSituation {
        Active = ("A", "Ativo"),
        Inactive = ("I", "Inativo"),
    }
    default = Active;
}

coded_enum! {
    /// ICMS taxation mode of a product.
    pub enum Taxation {
        Taxed = ("T", "Tributado"),
        Exempt = ("I", "Isento"),
        TaxSubstitution = ("F", "Substituição Tributária"),
    }
    default = Taxed;
}

coded_enum! {
    /// Agreement opening period status.
    pub enum OpeningStatus {
        Open = ("A", "Aberto"),
        Closed = ("F", "Fechado"),
    }
    default = Open;
}

coded_enum! {
    /// Payment status of one installment.
    pub enum PaymentStatus {
        Open = ("A", "Aberto"),
        Paid = ("P", "Pago"),
        Canceled = ("C", "Cancelado"),
    }
    default = Open;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_id_normalization() {
        let cpf = TaxId::parse("123.456.789-01").unwrap();
        assert_eq!(cpf.as_str(), "12345678901");
        assert_eq!(cpf.kind(), Some(TaxIdKind::Cpf));

        assert!(matches!(TaxId::parse(" .-/ "), Err(ValidationError::Required { .. })));
        assert!(matches!(TaxId::parse("1234"), Err(ValidationError::InvalidFormat { .. })));
        assert!(TaxId::parse_cnpj("123.456.789-01").is_err());
        assert!(TaxId::parse_cnpj("12.345.678/0001-90").is_ok());
    }

    #[test]
    fn test_reference_month_forms() {
        let month = ReferenceMonth::parse_display("07/2025", REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX).unwrap();
        assert_eq!(month.storage_code(), "072025");
        assert_eq!(month.display(), "07/2025");

        let stored = ReferenceMonth::parse_storage("072025", REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX).unwrap();
        assert_eq!(stored, month);
    }

    #[test]
    fn test_reference_month_rejections() {
        let parse = |s| ReferenceMonth::parse_display(s, REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX);
        assert!(parse("13/2025").is_err());
        assert!(parse("00/2025").is_err());
        assert!(parse("07/1899").is_err());
        assert!(parse("07/2101").is_err());
        assert!(parse("07-2025").is_err());
        assert!(parse("07/25").is_err());
        assert!(parse("a7/2025").is_err());
        assert!(parse("07/2025/1").is_err());
    }

    #[test]
    fn test_last_day_after() {
        let month = ReferenceMonth::parse_display("01/2024", REFERENCE_YEAR_MIN, ISSUANCE_YEAR_MAX).unwrap();
        assert_eq!(month.last_day_after(0), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(month.last_day_after(1), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(month.last_day_after(12), NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn test_percentage_parse() {
        assert_eq!("12,5".parse::<Percentage>().unwrap().hundredths(), 1250);
        assert_eq!("30%".parse::<Percentage>().unwrap().hundredths(), 3000);
        assert_eq!(Percentage::from_hundredths(1250).to_string(), "12.50");
        assert!(!Percentage::from_hundredths(10_001).is_within_full_range());
    }

    #[test]
    fn test_coded_enum_parsing() {
        assert_eq!("A".parse::<OpeningStatus>().unwrap(), OpeningStatus::Open);
        assert_eq!("fechado".parse::<OpeningStatus>().unwrap(), OpeningStatus::Closed);
        assert_eq!("3".parse::<TaxRegime>().unwrap(), TaxRegime::RegimeNormal);
        assert_eq!(CompanySituation::default(), CompanySituation::Active);
        assert_eq!(PaymentStatus::Paid.code(), "P");

        let err = "X".parse::<ProductKind>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAllowed {
                field: "ProductKind".to_string(),
                allowed: vec!["V".to_string(), "S".to_string()],
            }
        );
    }
}
