mod error;

use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Child, HomePlan, Income, Loan, MAX_AGE, MAX_LOAN_YEARS, Property, SaleTarget,
    SimulationSettings, YearSnapshot, project,
};

pub use error::RequestError;

/// Flat settings record. Every field is optional; missing values resolve to 0.
/// Rates are given in percent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPayload {
    current_age: Option<u32>,
    target_age: Option<u32>,

    cash: Option<f64>,
    nisa: Option<f64>,
    ideco: Option<f64>,
    taxable: Option<f64>,
    real_estate: Option<f64>,
    metals: Option<f64>,
    crypto: Option<f64>,
    foreign_currency: Option<f64>,

    nisa_monthly: Option<f64>,
    taxable_monthly: Option<f64>,
    ideco_monthly: Option<f64>,

    return_rate: Option<f64>,
    foreign_return_rate: Option<f64>,

    retirement_age: Option<u32>,
    retirement_bonus: Option<f64>,
    post_retirement_monthly_spending: Option<f64>,
    pension_monthly: Option<f64>,

    nisa_lifetime_limit: Option<f64>,
    nisa_used_quota: Option<f64>,

    home_purchase_age: Option<u32>,
    home_price: Option<f64>,
    home_down_payment: Option<f64>,
    home_loan_rate: Option<f64>,
    home_loan_years: Option<u32>,
    home_sale_age: Option<u32>,
    home_sale_price: Option<f64>,
    #[serde(alias = "saleTarget")]
    home_sale_target: Option<String>,
    home_repay_loan_on_sale: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForeignHolding {
    currency: String,
    amount: f64,
}

/// Full projection request: flat settings plus the collaborator records.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectPayload {
    #[serde(flatten)]
    settings: SettingsPayload,
    loans: Vec<Loan>,
    incomes: Vec<Income>,
    properties: Vec<Property>,
    children: Vec<Child>,
    foreign_holdings: Vec<ForeignHolding>,
    exchange_rates: HashMap<String, f64>,
}

/// Inputs resolved and validated once at the boundary.
#[derive(Debug, Clone)]
pub struct ProjectionRequest {
    pub settings: SimulationSettings,
    pub loans: Vec<Loan>,
    pub incomes: Vec<Income>,
    pub properties: Vec<Property>,
}

impl ProjectionRequest {
    pub fn run(&self) -> ProjectResponse {
        let years = project(&self.settings, &self.loans, &self.incomes, &self.properties);
        ProjectResponse::new(&self.settings, years)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub current_age: u32,
    pub target_age: u32,
    pub final_total_assets: f64,
    pub min_cash: f64,
    pub first_negative_cash_age: Option<u32>,
    pub years: Vec<YearSnapshot>,
}

impl ProjectResponse {
    fn new(settings: &SimulationSettings, years: Vec<YearSnapshot>) -> Self {
        let final_total_assets = years.last().map(|y| y.total_assets).unwrap_or(0.0);
        let min_cash = years
            .iter()
            .map(|y| y.cash)
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(settings.cash_start);
        let first_negative_cash_age = years.iter().find(|y| y.cash < 0.0).map(|y| y.age);
        Self {
            current_age: settings.current_age,
            target_age: settings.target_age,
            final_total_assets,
            min_cash,
            first_negative_cash_age,
            years,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, RequestError> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() {
        return Err(RequestError::NotFinite { field });
    }
    Ok(value)
}

fn non_negative(field: &'static str, value: Option<f64>) -> Result<f64, RequestError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(RequestError::Negative { field });
    }
    Ok(value)
}

fn rate(field: &'static str, percent: Option<f64>) -> Result<f64, RequestError> {
    let percent = finite(field, percent)?;
    if percent <= -100.0 {
        return Err(RequestError::InvalidRate { field });
    }
    Ok(percent / 100.0)
}

fn age(field: &'static str, value: Option<u32>) -> Result<Option<u32>, RequestError> {
    match value {
        Some(value) if value > MAX_AGE => Err(RequestError::AgeOutOfRange { field, value }),
        value => Ok(value),
    }
}

fn parse_sale_target(raw: Option<&str>) -> SaleTarget {
    match raw.map(str::trim) {
        None | Some("") | Some("purchased-home") | Some("purchasedHome") => {
            SaleTarget::PurchasedHome
        }
        Some(id) => SaleTarget::Property(id.to_string()),
    }
}

fn build_home_plan(payload: &SettingsPayload) -> Result<Option<HomePlan>, RequestError> {
    if payload.home_purchase_age.is_none() && payload.home_sale_age.is_none() {
        return Ok(None);
    }

    let price = non_negative("homePrice", payload.home_price)?;
    let down_payment = non_negative("homeDownPayment", payload.home_down_payment)?;
    if down_payment > price {
        return Err(RequestError::DownPaymentExceedsPrice);
    }

    let loan_years = payload.home_loan_years.unwrap_or(0);
    if loan_years > MAX_LOAN_YEARS {
        return Err(RequestError::LoanTermOutOfRange(loan_years));
    }

    Ok(Some(HomePlan {
        purchase_age: age("homePurchaseAge", payload.home_purchase_age)?,
        price,
        down_payment,
        loan_rate: rate("homeLoanRate", payload.home_loan_rate)?,
        loan_years,
        sale_age: age("homeSaleAge", payload.home_sale_age)?,
        sale_price: non_negative("homeSalePrice", payload.home_sale_price)?,
        sale_target: parse_sale_target(payload.home_sale_target.as_deref()),
        repay_loan_on_sale: payload.home_repay_loan_on_sale.unwrap_or(false),
    }))
}

fn build_settings(
    payload: &SettingsPayload,
    children: Vec<Child>,
) -> Result<SimulationSettings, RequestError> {
    let current_age = age("currentAge", payload.current_age)?.unwrap_or(0);
    let target_age = age("targetAge", payload.target_age)?.unwrap_or(0);
    if target_age < current_age {
        return Err(RequestError::InvalidAgeRange {
            current: current_age,
            target: target_age,
        });
    }

    for child in &children {
        age("children.age", Some(child.age))?;
    }

    let nisa_lifetime_limit = non_negative("nisaLifetimeLimit", payload.nisa_lifetime_limit)?;
    let nisa_used_quota = non_negative("nisaUsedQuota", payload.nisa_used_quota)?;
    if nisa_used_quota > nisa_lifetime_limit {
        return Err(RequestError::NisaQuotaExceeded {
            used: nisa_used_quota,
            limit: nisa_lifetime_limit,
        });
    }

    Ok(SimulationSettings {
        current_age,
        target_age,
        cash_start: finite("cash", payload.cash)?,
        nisa_start: non_negative("nisa", payload.nisa)?,
        ideco_start: non_negative("ideco", payload.ideco)?,
        taxable_start: non_negative("taxable", payload.taxable)?,
        real_estate_start: non_negative("realEstate", payload.real_estate)?,
        metals_start: non_negative("metals", payload.metals)?,
        crypto_start: non_negative("crypto", payload.crypto)?,
        foreign_start: non_negative("foreignCurrency", payload.foreign_currency)?,
        nisa_monthly_contribution: non_negative("nisaMonthly", payload.nisa_monthly)?,
        taxable_monthly_contribution: non_negative("taxableMonthly", payload.taxable_monthly)?,
        ideco_monthly_contribution: non_negative("idecoMonthly", payload.ideco_monthly)?,
        annual_return_rate: rate("returnRate", payload.return_rate)?,
        foreign_return_rate: rate("foreignReturnRate", payload.foreign_return_rate)?,
        retirement_age: age("retirementAge", payload.retirement_age)?.unwrap_or(0),
        retirement_bonus: non_negative("retirementBonus", payload.retirement_bonus)?,
        post_retirement_monthly_spending: non_negative(
            "postRetirementMonthlySpending",
            payload.post_retirement_monthly_spending,
        )?,
        monthly_pension: non_negative("pensionMonthly", payload.pension_monthly)?,
        nisa_lifetime_limit,
        nisa_used_quota,
        home: build_home_plan(payload)?,
        children,
    })
}

fn validate_loans(loans: &[Loan]) -> Result<(), RequestError> {
    for loan in loans {
        let invalid = |reason| RequestError::InvalidLoan {
            name: loan.name.clone(),
            reason,
        };
        if !loan.balance.is_finite() || loan.balance < 0.0 {
            return Err(invalid("balance must be a finite number >= 0"));
        }
        if !loan.monthly_payment.is_finite() || loan.monthly_payment < 0.0 {
            return Err(invalid("monthlyPayment must be a finite number >= 0"));
        }
        if !loan.interest_rate.is_finite() || loan.interest_rate < 0.0 {
            return Err(invalid("interestRate must be a finite number >= 0"));
        }
        for extra in &loan.extra_repayments {
            age("loans.extraRepayments.age", Some(extra.age))?;
        }
    }
    Ok(())
}

fn validate_properties(properties: &[Property]) -> Result<(), RequestError> {
    for property in properties {
        age("properties.saleAge", property.sale_age)?;
    }
    Ok(())
}

fn foreign_holdings_value(
    holdings: &[ForeignHolding],
    rates: &HashMap<String, f64>,
) -> Result<f64, RequestError> {
    let mut total = 0.0;
    for holding in holdings {
        let Some(rate) = rates.get(&holding.currency).copied().filter(|r| r.is_finite()) else {
            return Err(RequestError::MissingExchangeRate(holding.currency.clone()));
        };
        total += non_negative("foreignHoldings.amount", Some(holding.amount))? * rate;
    }
    Ok(total)
}

fn projection_request_from_payload(
    payload: ProjectPayload,
) -> Result<ProjectionRequest, RequestError> {
    let mut settings = build_settings(&payload.settings, payload.children)?;
    settings.foreign_start +=
        foreign_holdings_value(&payload.foreign_holdings, &payload.exchange_rates)?;

    if let Some(HomePlan {
        sale_target: SaleTarget::Property(id),
        ..
    }) = &settings.home
    {
        if !payload.properties.iter().any(|p| &p.id == id) {
            return Err(RequestError::UnknownSaleTarget(id.clone()));
        }
    }

    validate_loans(&payload.loans)?;
    validate_properties(&payload.properties)?;

    Ok(ProjectionRequest {
        settings,
        loans: payload.loans,
        incomes: payload.incomes,
        properties: payload.properties,
    })
}

pub fn projection_request_from_json(json: &str) -> Result<ProjectionRequest, RequestError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| RequestError::InvalidJson(e.to_string()))?;
    projection_request_from_payload(payload)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("lifeplan HTTP API listening on http://{addr}");
    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(settings): Query<SettingsPayload>) -> Response {
    project_handler_impl(ProjectPayload {
        settings,
        ..ProjectPayload::default()
    })
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match projection_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            log::info!("rejected projection request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };
    json_response(StatusCode::OK, request.run())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
