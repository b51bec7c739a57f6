//! # Entity Schemas
//!
//! One static description per entity: its form fields (type, constraints,
//! display metadata) and its list allowlists. The form cleaners read labels
//! and limits from here, the repositories read the list allowlists, and the
//! HTTP layer serves the same description to whatever renders the forms.
//!
//! ## Shape
//! ```text
//! EntitySchema
//! ├── key / label / label_plural
//! ├── fields: [FieldSpec]   name, label, kind, required, max_len, help, computed
//! └── list:   ListSpec      search fields, sort allowlist, default sort, status
//! ```
//!
//! Computed fields (a client's balance, an issuance's balance snapshot) are
//! described so they can be displayed, but any submitted value is ignored.

use serde::Serialize;

use crate::query::{ListSpec, SortOrder, StatusFilter};
use crate::types::{
    AccessLevel, CompanySituation, CompanySize, OpeningStatus, Permission, ProductKind,
    ProductSituation, RecordStatus, SaleUnit, TaxRegime, Taxation,
};

// =============================================================================
// Field description
// =============================================================================

/// Input type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Password,
    /// CPF or CNPJ; punctuation is stripped
    TaxId,
    /// Digits only after stripping punctuation
    Digits,
    Money,
    Percentage,
    Quantity,
    Integer,
    /// Checkbox; absent means false
    Boolean,
    Date,
    Time,
    /// `MM/AAAA`
    ReferenceMonth,
    /// `(code, label)` pairs
    Choice(&'static [(&'static str, &'static str)]),
    /// Identifier of a record of the named entity
    Reference(&'static str),
}

/// One form field.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_len: Option<usize>,
    pub help: Option<&'static str>,
    /// Server-computed; submitted values are ignored
    pub computed: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            label,
            kind,
            required: false,
            max_len: None,
            help: None,
            computed: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn max(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub const fn help(mut self, text: &'static str) -> Self {
        self.help = Some(text);
        self
    }

    pub const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
}

/// Everything the forms and list views need to know about one entity.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntitySchema {
    /// URL segment and lookup key
    pub key: &'static str,
    pub label: &'static str,
    pub label_plural: &'static str,
    pub fields: &'static [FieldSpec],
    pub list: ListSpec,
}

impl EntitySchema {
    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Display label of a field.
    pub fn label_of(&self, name: &str) -> &'static str {
        self.field(name).map(|f| f.label).unwrap_or("Field")
    }
}

use FieldKind::*;

// =============================================================================
// Shared pieces
// =============================================================================

const CANCELLED_STATUS: StatusFilter = StatusFilter::Flag {
    column: "cancelled",
    true_values: &["cancelado", "cancelled"],
    false_values: &["ativo", "active"],
};

/// Fiscal tables filter on `true` (cancelled) / `false` (active).
const FISCAL_STATUS: StatusFilter = StatusFilter::Flag {
    column: "cancelled",
    true_values: &["true", "cancelado", "cancelled"],
    false_values: &["false", "ativo", "active"],
};

const CANCELLED: FieldSpec = FieldSpec::new("cancelled", "Cancelled", Boolean);

/// Regimes a CST/CSOSN code may belong to.
pub const CST_REGIMES: &[(&str, &str)] = &[("1", "Simples Nacional"), ("3", "Regime Normal")];

// =============================================================================
// Registry
// =============================================================================

pub static CLIENT: EntitySchema = EntitySchema {
    key: "clients",
    label: "Client",
    label_plural: "Clients",
    fields: &[
        FieldSpec::new("internal_code", "Internal code", Text).required().max(20),
        FieldSpec::new("registration", "Registration", Text).max(20),
        CANCELLED,
        FieldSpec::new("full_name", "Full name", Text).required().max(150),
        FieldSpec::new("tax_id", "CPF/CNPJ", TaxId).required().max(18),
        FieldSpec::new("rg", "RG", Text).max(20),
        FieldSpec::new("phone", "Phone", Phone).max(20),
        FieldSpec::new("email", "Email", Email).required().max(254),
        FieldSpec::new("street", "Street", Text).max(200),
        FieldSpec::new("postal_code", "Postal code", Text).max(9),
        FieldSpec::new("city", "City", Text).required().max(100),
        FieldSpec::new("state", "State", Text).required().max(2).help("Two-letter state code"),
        FieldSpec::new("salary", "Salary", Money),
        FieldSpec::new("percentage", "Percentage", Percentage).help("Share of the salary available as credit"),
        FieldSpec::new("balance", "Balance", Money)
            .computed()
            .help("Salary × percentage / 100"),
    ],
    list: ListSpec {
        search_fields: &["full_name", "tax_id"],
        sort_fields: &[
            "internal_code",
            "full_name",
            "tax_id",
            "city",
            "state",
            "balance_cents",
            "cancelled",
        ],
        default_sort: "full_name",
        default_order: SortOrder::Asc,
        status: CANCELLED_STATUS,
    },
};

pub static COMPANY: EntitySchema = EntitySchema {
    key: "companies",
    label: "Company",
    label_plural: "Companies",
    fields: &[
        FieldSpec::new("store_code", "Store code", Text).required().max(50),
        FieldSpec::new("tax_id", "CNPJ", TaxId).required().max(18),
        FieldSpec::new("state_registration", "State registration", Text).max(20),
        FieldSpec::new("size", "Size", Choice(CompanySize::CHOICES)),
        FieldSpec::new("situation", "Situation", Choice(CompanySituation::CHOICES)),
        FieldSpec::new("opened_on", "Opening date", Date),
        FieldSpec::new("name", "Name", Text).required().max(255),
        FieldSpec::new("legal_name", "Legal name", Text).required().max(255),
        FieldSpec::new("trade_name", "Trade name", Text).max(255),
        FieldSpec::new("contact", "Contact", Text).max(100),
        FieldSpec::new("phone", "Phone", Phone).max(20),
        FieldSpec::new("email", "Email", Email).max(255),
        FieldSpec::new("street", "Street", Text).max(255),
        FieldSpec::new("number", "Number", Text).max(10),
        FieldSpec::new("district", "District", Text).max(100),
        FieldSpec::new("city", "City", Text).max(100),
        FieldSpec::new("state", "State", Text).max(2),
        FieldSpec::new("postal_code", "Postal code", Text).max(10),
        FieldSpec::new("main_cnae", "Main CNAE", Text).max(100),
        FieldSpec::new("simples_rate", "Simples rate", Percentage),
        FieldSpec::new("tax_regime", "Tax regime", Choice(TaxRegime::CHOICES)).required(),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["trade_name", "legal_name", "tax_id", "street"],
        sort_fields: &[
            "store_code",
            "name",
            "legal_name",
            "trade_name",
            "tax_id",
            "city",
            "state",
            "situation",
            "cancelled",
            "created_at",
            "updated_at",
        ],
        default_sort: "trade_name",
        default_order: SortOrder::Asc,
        status: CANCELLED_STATUS,
    },
};

pub static USER: EntitySchema = EntitySchema {
    key: "users",
    label: "User",
    label_plural: "Users",
    fields: &[
        FieldSpec::new("company_id", "Company", Reference("companies")),
        FieldSpec::new("access_level", "Access level", Choice(AccessLevel::CHOICES)).required(),
        FieldSpec::new("permission", "Permission", Choice(Permission::CHOICES)).required(),
        FieldSpec::new("name", "Name", Text).required().max(255),
        FieldSpec::new("username", "Username", Text).required().max(100),
        FieldSpec::new("password", "Password", Password)
            .max(128)
            .help("Required for new users; leave blank to keep the current one"),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["name", "username"],
        sort_fields: &[
            "name",
            "username",
            "access_level",
            "permission",
            "cancelled",
            "created_at",
            "updated_at",
        ],
        default_sort: "name",
        default_order: SortOrder::Asc,
        status: CANCELLED_STATUS,
    },
};

// =============================================================================
// Classification tables
// =============================================================================

const CLASSIFICATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("code", "Code", Text).required().max(20),
    FieldSpec::new("description", "Description", Text).required().max(255),
    CANCELLED,
];

const CLASSIFICATION_LIST: ListSpec = ListSpec {
    search_fields: &["code", "description"],
    sort_fields: &["code", "description", "cancelled", "created_at", "updated_at"],
    default_sort: "description",
    default_order: SortOrder::Asc,
    status: CANCELLED_STATUS,
};

pub static SECTOR: EntitySchema = EntitySchema {
    key: "sectors",
    label: "Sector",
    label_plural: "Sectors",
    fields: CLASSIFICATION_FIELDS,
    list: CLASSIFICATION_LIST,
};

pub static CATEGORY: EntitySchema = EntitySchema {
    key: "categories",
    label: "Category",
    label_plural: "Categories",
    fields: CLASSIFICATION_FIELDS,
    list: CLASSIFICATION_LIST,
};

pub static GROUP: EntitySchema = EntitySchema {
    key: "groups",
    label: "Group",
    label_plural: "Groups",
    fields: CLASSIFICATION_FIELDS,
    list: CLASSIFICATION_LIST,
};

pub static SUB_GROUP: EntitySchema = EntitySchema {
    key: "sub-groups",
    label: "Sub-group",
    label_plural: "Sub-groups",
    fields: &[
        FieldSpec::new("group_id", "Group", Reference("groups")).required(),
        FieldSpec::new("name", "Name", Text).required().max(50),
        FieldSpec::new("status", "Status", Choice(RecordStatus::CHOICES)),
    ],
    list: ListSpec {
        search_fields: &["name", "group_description"],
        sort_fields: &["name", "group_description", "status", "created_at", "updated_at"],
        default_sort: "name",
        default_order: SortOrder::Asc,
        status: StatusFilter::Code {
            column: "status",
            values: &[("A", "A"), ("ativo", "A"), ("C", "C"), ("cancelado", "C")],
        },
    },
};

pub static NCM: EntitySchema = EntitySchema {
    key: "ncms",
    label: "NCM",
    label_plural: "NCMs",
    fields: &[
        FieldSpec::new("code", "NCM", Digits).required().max(10),
        FieldSpec::new("description", "Description", Text).required().max(300),
        FieldSpec::new("valid_from", "Valid from", Date),
        FieldSpec::new("valid_until", "Valid until", Date),
        FieldSpec::new("year", "Year", Digits).max(4),
        FieldSpec::new("number", "Number", Text).max(10),
        FieldSpec::new("segment", "Segment", Text).max(100),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["code", "description"],
        sort_fields: &[
            "code",
            "description",
            "valid_from",
            "valid_until",
            "year",
            "number",
            "cancelled",
            "created_at",
            "updated_at",
        ],
        default_sort: "code",
        default_order: SortOrder::Asc,
        status: FISCAL_STATUS,
    },
};

pub static CFOP: EntitySchema = EntitySchema {
    key: "cfops",
    label: "CFOP",
    label_plural: "CFOPs",
    fields: &[
        FieldSpec::new("code", "CFOP", Digits).required().max(4).help("Exactly 4 digits"),
        FieldSpec::new("category", "Category", Text).required().max(800),
        FieldSpec::new("description", "Description", Text).required().max(900),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["code", "category", "description"],
        sort_fields: &["code", "category", "description", "cancelled", "created_at", "updated_at"],
        default_sort: "code",
        default_order: SortOrder::Asc,
        status: FISCAL_STATUS,
    },
};

pub static CEST: EntitySchema = EntitySchema {
    key: "cests",
    label: "CEST",
    label_plural: "CESTs",
    fields: &[
        FieldSpec::new("code", "CEST", Digits).required().max(9).help("7 or 9 digits"),
        FieldSpec::new("description", "Description", Text).required().max(900),
        FieldSpec::new("ncm_code", "NCM code", Text).max(300),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["code", "description", "ncm_code"],
        sort_fields: &["code", "description", "ncm_code", "cancelled", "created_at", "updated_at"],
        default_sort: "code",
        default_order: SortOrder::Asc,
        status: FISCAL_STATUS,
    },
};

pub static CST_CSON: EntitySchema = EntitySchema {
    key: "cst-csons",
    label: "CST/CSOSN",
    label_plural: "CST/CSOSN codes",
    fields: &[
        FieldSpec::new("code", "CST/CSOSN", Digits).required().max(3).help("Exactly 3 digits"),
        FieldSpec::new("description", "Description", Text).required().max(600),
        FieldSpec::new("regime", "Regime", Choice(CST_REGIMES)).required(),
        CANCELLED,
    ],
    list: ListSpec {
        search_fields: &["code", "description"],
        sort_fields: &["code", "description", "regime", "cancelled", "created_at", "updated_at"],
        default_sort: "code",
        default_order: SortOrder::Asc,
        status: FISCAL_STATUS,
    },
};

// =============================================================================
// Product
// =============================================================================

pub static PRODUCT: EntitySchema = EntitySchema {
    key: "products",
    label: "Product",
    label_plural: "Products",
    fields: &[
        FieldSpec::new("ean_code", "EAN/DUN code", Text).required().max(50),
        FieldSpec::new("description", "Description", Text).required().max(255),
        FieldSpec::new("pos_description", "POS description", Text).max(255),
        FieldSpec::new("sale_unit", "Sale unit", Choice(SaleUnit::CHOICES)).required(),
        FieldSpec::new("package_qty", "Units per package", Quantity),
        FieldSpec::new("kind", "Type", Choice(ProductKind::CHOICES)).required(),
        FieldSpec::new("weighed", "Weighed", Boolean).help("Not allowed for services"),
        FieldSpec::new("multipliable", "Multipliable", Boolean),
        FieldSpec::new("own_use", "Own use", Boolean).help("Not allowed for services"),
        FieldSpec::new("situation", "Situation", Choice(ProductSituation::CHOICES)),
        FieldSpec::new("icms_rate", "ICMS rate", Percentage),
        FieldSpec::new("stock", "Stock", Quantity),
        FieldSpec::new("net_weight", "Net weight", Quantity),
        FieldSpec::new("gross_weight", "Gross weight", Quantity),
        FieldSpec::new("price", "Price", Money).required(),
        FieldSpec::new("classification", "Classification", Text).max(100),
        FieldSpec::new("taxation", "Taxation", Choice(Taxation::CHOICES)).required(),
        FieldSpec::new("sector_id", "Sector", Reference("sectors")),
        FieldSpec::new("group_id", "Group", Reference("groups")),
        FieldSpec::new("sub_group_id", "Sub-group", Reference("sub-groups")),
        FieldSpec::new("cfop_id", "CFOP", Reference("cfops")),
        FieldSpec::new("cst_cson_id", "CST/CSOSN", Reference("cst-csons")),
        FieldSpec::new("ncm_id", "NCM", Reference("ncms")),
        FieldSpec::new("cest_id", "CEST", Reference("cests")),
    ],
    list: ListSpec {
        search_fields: &["ean_code", "description"],
        sort_fields: &[
            "ean_code",
            "description",
            "price_cents",
            "stock_thousandths",
            "situation",
            "created_at",
            "updated_at",
        ],
        default_sort: "description",
        default_order: SortOrder::Asc,
        status: StatusFilter::Code {
            column: "situation",
            values: &[("A", "A"), ("ativo", "A"), ("I", "I"), ("inativo", "I")],
        },
    },
};

// =============================================================================
// Agreements
// =============================================================================

pub static AGREEMENT: EntitySchema = EntitySchema {
    key: "agreements",
    label: "Agreement",
    label_plural: "Agreements",
    fields: &[
        FieldSpec::new("store_code", "Store code", Integer),
        FieldSpec::new("name", "Name", Text).required().max(100),
        FieldSpec::new("tax_id", "CNPJ", TaxId).required().max(18),
        FieldSpec::new("contact", "Contact", Text).max(100),
        FieldSpec::new("email", "Email", Email).max(100),
        FieldSpec::new("phone", "Phone", Phone).max(20),
        FieldSpec::new("active", "Active", Boolean),
        FieldSpec::new("max_installments", "Maximum installments", Integer).required(),
        FieldSpec::new("event_code", "Event code", Text).max(20),
        FieldSpec::new("logo_ref", "Logo", Text).max(255).help("Reference to the stored logo file"),
    ],
    list: ListSpec {
        search_fields: &["store_code", "name", "tax_id", "contact", "email", "phone", "event_code"],
        sort_fields: &[
            "store_code",
            "name",
            "tax_id",
            "contact",
            "email",
            "phone",
            "active",
            "max_installments",
            "event_code",
            "created_at",
            "updated_at",
        ],
        default_sort: "name",
        default_order: SortOrder::Asc,
        status: StatusFilter::Flag {
            column: "active",
            true_values: &["true", "ativo", "active"],
            false_values: &["false", "inativo", "inactive"],
        },
    },
};

pub static AGREEMENT_OPENING: EntitySchema = EntitySchema {
    key: "agreement-openings",
    label: "Agreement opening",
    label_plural: "Agreement openings",
    fields: &[
        FieldSpec::new("reference_month", "Reference month", ReferenceMonth)
            .required()
            .max(7)
            .help("MM/AAAA"),
        FieldSpec::new("status", "Status", Choice(OpeningStatus::CHOICES)).required(),
        FieldSpec::new("opened_on", "Opening date", Date).required(),
        FieldSpec::new("closed_on", "Closing date", Date),
        FieldSpec::new("paid_on", "Payment date", Date),
    ],
    list: ListSpec {
        search_fields: &["reference_month", "status"],
        sort_fields: &["reference_key", "opened_on", "closed_on", "paid_on", "status"],
        default_sort: "reference_key",
        default_order: SortOrder::Desc,
        status: StatusFilter::Code {
            column: "status",
            values: &[("A", "A"), ("F", "F")],
        },
    },
};

pub static ISSUANCE: EntitySchema = EntitySchema {
    key: "issuances",
    label: "Issuance",
    label_plural: "Issuances",
    fields: &[
        FieldSpec::new("tax_id", "CPF/CNPJ", TaxId).required().max(18),
        FieldSpec::new("client_id", "Client", Reference("clients"))
            .help("Filled by the tax ID lookup; must match the tax ID"),
        FieldSpec::new("balance", "Available balance", Money)
            .computed()
            .help("Client's current balance"),
        FieldSpec::new("agreement_id", "Agreement", Reference("agreements")).required(),
        FieldSpec::new("value", "Value", Money).required(),
        FieldSpec::new("installments", "Installments", Integer).required(),
        FieldSpec::new("reference_month", "Reference month", ReferenceMonth)
            .required()
            .max(7)
            .help("MM/AAAA"),
    ],
    list: ListSpec {
        search_fields: &["tax_id", "client_name", "agreement_name", "reference_month"],
        sort_fields: &[
            "tax_id",
            "client_name",
            "agreement_name",
            "value_cents",
            "installments",
            "reference_month",
            "transaction_date",
            "transaction_time",
            "created_at",
        ],
        default_sort: "transaction_date",
        default_order: SortOrder::Desc,
        status: StatusFilter::None,
    },
};

pub static SALE: EntitySchema = EntitySchema {
    key: "sales",
    label: "Sale",
    label_plural: "Sales",
    fields: &[
        FieldSpec::new("user_id", "User", Reference("users")).required(),
        FieldSpec::new("issuance_id", "Issuance", Reference("issuances")).required(),
        FieldSpec::new("client_id", "Client", Reference("clients"))
            .computed()
            .help("Taken from the issuance"),
        FieldSpec::new("agreement_id", "Agreement", Reference("agreements"))
            .computed()
            .help("Taken from the issuance"),
        FieldSpec::new("sale_date", "Date", Date).help("Defaults to today"),
        FieldSpec::new("sale_time", "Time", Time).help("Defaults to now"),
        FieldSpec::new("value", "Value", Money).help("Defaults to the issuance value"),
        FieldSpec::new("installments", "Installments", Integer)
            .help("Defaults to the issuance installment count"),
    ],
    list: ListSpec {
        search_fields: &["username", "client_name", "agreement_name"],
        sort_fields: &[
            "sale_date",
            "sale_time",
            "username",
            "client_name",
            "agreement_name",
            "value_cents",
            "installments",
            "created_at",
        ],
        default_sort: "sale_date",
        default_order: SortOrder::Desc,
        status: StatusFilter::None,
    },
};

/// Every entity, in menu order.
pub static ALL: &[&EntitySchema] = &[
    &CLIENT,
    &COMPANY,
    &USER,
    &SECTOR,
    &CATEGORY,
    &GROUP,
    &SUB_GROUP,
    &NCM,
    &CFOP,
    &CEST,
    &CST_CSON,
    &PRODUCT,
    &AGREEMENT,
    &AGREEMENT_OPENING,
    &ISSUANCE,
    &SALE,
];

/// Looks a schema up by its key.
pub fn by_key(key: &str) -> Option<&'static EntitySchema> {
    ALL.iter().copied().find(|schema| schema.key == key)
}

// =============================================================================
// Unit Tests
// =============================================================================
