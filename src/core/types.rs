use serde::{Deserialize, Serialize};

use super::education::EducationCourse;

/// Fully resolved projection inputs. Rates are fractions (0.05 = 5%).
#[derive(Debug, Clone, Default)]
pub struct SimulationSettings {
    pub current_age: u32,
    pub target_age: u32,

    pub cash_start: f64,
    pub nisa_start: f64,
    pub ideco_start: f64,
    pub taxable_start: f64,
    pub real_estate_start: f64,
    pub metals_start: f64,
    pub crypto_start: f64,
    pub foreign_start: f64,

    pub nisa_monthly_contribution: f64,
    pub taxable_monthly_contribution: f64,
    pub ideco_monthly_contribution: f64,

    pub annual_return_rate: f64,
    pub foreign_return_rate: f64,

    pub retirement_age: u32,
    pub retirement_bonus: f64,
    pub post_retirement_monthly_spending: f64,
    pub monthly_pension: f64,

    pub nisa_lifetime_limit: f64,
    pub nisa_used_quota: f64,

    pub home: Option<HomePlan>,
    pub children: Vec<Child>,
}

/// One-time home purchase, optionally followed by a sale.
#[derive(Debug, Clone, Default)]
pub struct HomePlan {
    pub purchase_age: Option<u32>,
    pub price: f64,
    pub down_payment: f64,
    /// Annual loan rate as a fraction.
    pub loan_rate: f64,
    pub loan_years: u32,
    pub sale_age: Option<u32>,
    pub sale_price: f64,
    pub sale_target: SaleTarget,
    pub repay_loan_on_sale: bool,
}

/// What the settings-level sale parameters apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaleTarget {
    #[default]
    PurchasedHome,
    Property(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Loan {
    pub id: Option<String>,
    pub name: String,
    pub balance: f64,
    pub monthly_payment: f64,
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    pub extra_repayments: Vec<ExtraRepayment>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtraRepayment {
    pub age: u32,
    pub amount: f64,
    pub is_full_payoff: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Income {
    pub name: String,
    /// Monthly amount.
    pub amount: f64,
    pub property_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub sale_age: Option<u32>,
    pub sale_price: Option<f64>,
    pub loan_id: Option<String>,
    pub repay_linked_loan_on_sale: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Child {
    pub name: Option<String>,
    /// Age at the start of the projection.
    pub age: u32,
    pub education_course: EducationCourse,
    pub custom_costs: Option<CustomEducationCosts>,
    pub study_abroad: bool,
}

/// Per-phase annual cost overrides.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomEducationCosts {
    pub elementary: Option<f64>,
    pub middle: Option<f64>,
    pub high: Option<f64>,
    pub university: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanStatus {
    Active,
    PaidOff,
    Stalled,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanPaymentKind {
    Scheduled,
    SaleRepayment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPayment {
    pub name: String,
    pub kind: LoanPaymentKind,
    pub amount: f64,
    pub extra_repayment: f64,
    pub remaining_balance: f64,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationCost {
    pub child: String,
    pub child_age: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySale {
    pub name: String,
    pub sale_price: f64,
    pub book_value: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributions {
    pub nisa: f64,
    pub nisa_overflow: f64,
    pub taxable: f64,
    pub ideco: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBreakdown {
    pub loans: Vec<LoanPayment>,
    pub education: Vec<EducationCost>,
    pub education_total: f64,
    pub living: f64,
    pub retirement_bonus: f64,
    pub contributions: Contributions,
    pub nisa_used_quota: f64,
    pub property_sales: Vec<PropertySale>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub age: u32,
    pub cash: f64,
    pub nisa: f64,
    pub ideco: f64,
    pub taxable: f64,
    pub real_estate: f64,
    pub metals: f64,
    pub crypto: f64,
    pub foreign: f64,
    pub total_assets: f64,
    pub income: f64,
    pub expense: f64,
    pub breakdown: YearBreakdown,
}
