use std::collections::HashSet;

use super::education::annual_education_cost;
use super::loans::LoanState;
use super::types::{
    Contributions, EducationCost, HomePlan, Income, Loan, LoanPayment, LoanPaymentKind, Property,
    PropertySale, SaleTarget, SimulationSettings, YearBreakdown, YearSnapshot,
};

const PRE_RETIREMENT_LIVING_COST_RATIO: f64 = 0.7;
const MORTGAGE_NAME: &str = "Home loan";
const PLANNED_HOME_NAME: &str = "Planned home";

/// Oldest age accepted at the request boundary.
pub const MAX_AGE: u32 = 150;

/// Order in which surplus cash is invested each year.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ContributionStep {
    Nisa,
    Taxable,
    Ideco,
    GrowthOnly,
}

const CONTRIBUTION_WATERFALL: [ContributionStep; 4] = [
    ContributionStep::Nisa,
    ContributionStep::Taxable,
    ContributionStep::Ideco,
    ContributionStep::GrowthOnly,
];

#[derive(Debug, Clone, Copy)]
struct Portfolio {
    cash: f64,
    nisa: f64,
    ideco: f64,
    taxable: f64,
    real_estate: f64,
    metals: f64,
    crypto: f64,
    foreign: f64,
}

impl Portfolio {
    fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            cash: settings.cash_start,
            nisa: settings.nisa_start,
            ideco: settings.ideco_start,
            taxable: settings.taxable_start,
            real_estate: settings.real_estate_start,
            metals: settings.metals_start,
            crypto: settings.crypto_start,
            foreign: settings.foreign_start,
        }
    }

    fn total(&self) -> f64 {
        self.cash
            + self.nisa
            + self.ideco
            + self.taxable
            + self.real_estate
            + self.metals
            + self.crypto
            + self.foreign
    }
}

/// Mutable state carried from one simulated year to the next.
struct ProjectionState {
    portfolio: Portfolio,
    nisa_used_quota: f64,
    loans: Vec<LoanState>,
    mortgage: Option<LoanState>,
    home_owned: bool,
    sold_properties: HashSet<String>,
}

/// Per-year scratch values built up before the cash update.
#[derive(Default)]
struct YearLedger {
    // Lump sums already committed from cash this year.
    lump_outflow: f64,
    loan_expense: f64,
    breakdown: YearBreakdown,
}

impl YearLedger {
    fn available_cash(&self, portfolio: &Portfolio) -> f64 {
        (portfolio.cash - self.lump_outflow).max(0.0)
    }
}

/// Projects year-end balances from `current_age` through `target_age` inclusive.
///
/// Inputs are only read; every run starts from the declared opening balances.
pub fn project(
    settings: &SimulationSettings,
    loans: &[Loan],
    incomes: &[Income],
    properties: &[Property],
) -> Vec<YearSnapshot> {
    if settings.target_age < settings.current_age {
        return Vec::new();
    }

    log::debug!(
        "projecting ages {}..={} with {} loans, {} incomes, {} properties, {} children",
        settings.current_age,
        settings.target_age,
        loans.len(),
        incomes.len(),
        properties.len(),
        settings.children.len()
    );

    let mut state = ProjectionState {
        portfolio: Portfolio::from_settings(settings),
        nisa_used_quota: settings.nisa_used_quota,
        loans: loans.iter().map(LoanState::from_record).collect(),
        mortgage: None,
        home_owned: false,
        sold_properties: HashSet::new(),
    };

    let years = u64::from(settings.target_age - settings.current_age) + 1;
    let mut snapshots = Vec::with_capacity(years.min(u64::from(MAX_AGE) + 1) as usize);
    for (years_since_start, age) in (settings.current_age..=settings.target_age).enumerate() {
        snapshots.push(simulate_year(
            settings,
            incomes,
            properties,
            &mut state,
            age,
            years_since_start as u32,
        ));
    }
    snapshots
}

fn simulate_year(
    settings: &SimulationSettings,
    incomes: &[Income],
    properties: &[Property],
    state: &mut ProjectionState,
    age: u32,
    years_since_start: u32,
) -> YearSnapshot {
    let mut ledger = YearLedger::default();

    apply_property_sales(settings, properties, state, &mut ledger, age);
    if let Some(home) = &settings.home {
        apply_planned_home_sale(home, state, &mut ledger, age);
        apply_home_purchase(home, state, age);
    }
    apply_loan_year(state, &mut ledger, age);

    let income = yearly_income(settings, incomes, &state.sold_properties, age);
    if age == settings.retirement_age {
        ledger.breakdown.retirement_bonus = settings.retirement_bonus;
    }

    let education_total = apply_education_costs(settings, &mut ledger, years_since_start);
    let living = living_cost(settings, age, income);
    ledger.breakdown.living = living;

    let expense = ledger.loan_expense + education_total + living;
    state.portfolio.cash += income - expense;

    ledger.breakdown.contributions = apply_contribution_waterfall(settings, state);
    ledger.breakdown.nisa_used_quota = state.nisa_used_quota;

    let p = state.portfolio;
    YearSnapshot {
        age,
        cash: p.cash,
        nisa: p.nisa,
        ideco: p.ideco,
        taxable: p.taxable,
        real_estate: p.real_estate,
        metals: p.metals,
        crypto: p.crypto,
        foreign: p.foreign,
        total_assets: p.total(),
        income,
        expense,
        breakdown: ledger.breakdown,
    }
}

/// Sale age, sale price and repay flag for a registered property, with the
/// settings-level sale taking precedence when it targets this property.
fn effective_sale(settings: &SimulationSettings, property: &Property) -> Option<(u32, f64, bool)> {
    if let Some(home) = &settings.home {
        if matches!(&home.sale_target, SaleTarget::Property(id) if *id == property.id) {
            if let Some(sale_age) = home.sale_age {
                return Some((
                    sale_age,
                    home.sale_price,
                    home.repay_loan_on_sale || property.repay_linked_loan_on_sale,
                ));
            }
        }
    }

    property.sale_age.map(|sale_age| {
        (
            sale_age,
            property.sale_price.unwrap_or(property.value),
            property.repay_linked_loan_on_sale,
        )
    })
}

fn apply_property_sales(
    settings: &SimulationSettings,
    properties: &[Property],
    state: &mut ProjectionState,
    ledger: &mut YearLedger,
    age: u32,
) {
    for property in properties {
        let Some((sale_age, sale_price, repay_loan)) = effective_sale(settings, property) else {
            continue;
        };
        if sale_age != age || state.sold_properties.contains(&property.id) {
            continue;
        }

        state.portfolio.cash += sale_price;
        state.portfolio.real_estate -= property.value;
        state.sold_properties.insert(property.id.clone());
        ledger.breakdown.property_sales.push(PropertySale {
            name: property.name.clone(),
            sale_price,
            book_value: property.value,
        });
        log::debug!("age {age}: sold '{}' for {sale_price:.0}", property.name);

        if !repay_loan {
            continue;
        }
        let Some(loan_id) = property.loan_id.as_deref() else {
            continue;
        };
        let available = ledger.available_cash(&state.portfolio);
        if let Some(loan) = state
            .loans
            .iter_mut()
            .find(|l| l.id.as_deref() == Some(loan_id) && l.is_open())
        {
            let repaid = loan.repay_in_full(available);
            record_sale_repayment(ledger, loan, repaid);
        }
    }
}

fn apply_planned_home_sale(
    home: &HomePlan,
    state: &mut ProjectionState,
    ledger: &mut YearLedger,
    age: u32,
) {
    if home.sale_target != SaleTarget::PurchasedHome
        || home.sale_age != Some(age)
        || !state.home_owned
    {
        return;
    }

    state.portfolio.cash += home.sale_price;
    state.portfolio.real_estate -= home.price;
    state.home_owned = false;
    ledger.breakdown.property_sales.push(PropertySale {
        name: PLANNED_HOME_NAME.to_string(),
        sale_price: home.sale_price,
        book_value: home.price,
    });

    if !home.repay_loan_on_sale {
        return;
    }
    let available = ledger.available_cash(&state.portfolio);
    if let Some(mortgage) = state.mortgage.as_mut().filter(|m| m.is_open()) {
        let repaid = mortgage.repay_in_full(available);
        record_sale_repayment(ledger, mortgage, repaid);
    }
}

fn record_sale_repayment(ledger: &mut YearLedger, loan: &LoanState, repaid: f64) {
    ledger.lump_outflow += repaid;
    ledger.loan_expense += repaid;
    ledger.breakdown.loans.push(LoanPayment {
        name: loan.name.clone(),
        kind: LoanPaymentKind::SaleRepayment,
        amount: repaid,
        extra_repayment: 0.0,
        remaining_balance: loan.balance,
        status: loan.status(),
    });
}

fn apply_home_purchase(home: &HomePlan, state: &mut ProjectionState, age: u32) {
    if home.purchase_age != Some(age) {
        return;
    }

    state.portfolio.cash -= home.down_payment;
    state.portfolio.real_estate += home.price;
    state.home_owned = true;

    let principal = (home.price - home.down_payment).max(0.0);
    if principal > 0.0 {
        let mortgage = LoanState::mortgage(MORTGAGE_NAME, principal, home.loan_rate, home.loan_years);
        log::debug!(
            "age {age}: home purchased, mortgage {principal:.0} at {:.0}/month",
            mortgage.monthly_payment
        );
        state.mortgage = Some(mortgage);
    }
}

fn apply_loan_year(state: &mut ProjectionState, ledger: &mut YearLedger, age: u32) {
    for loan in state.mortgage.iter_mut().chain(state.loans.iter_mut()) {
        if !loan.is_open() {
            continue;
        }

        let extra = loan.apply_extra_repayment(age, ledger.available_cash(&state.portfolio));
        ledger.lump_outflow += extra;
        let scheduled = loan.amortize_year();
        let paid = extra + scheduled;
        ledger.loan_expense += paid;
        ledger.breakdown.loans.push(LoanPayment {
            name: loan.name.clone(),
            kind: LoanPaymentKind::Scheduled,
            amount: paid,
            extra_repayment: extra,
            remaining_balance: loan.balance,
            status: loan.status(),
        });
    }
}

fn yearly_income(
    settings: &SimulationSettings,
    incomes: &[Income],
    sold_properties: &HashSet<String>,
    age: u32,
) -> f64 {
    if age < settings.retirement_age {
        let monthly: f64 = incomes
            .iter()
            .filter(|income| {
                income
                    .property_id
                    .as_ref()
                    .is_none_or(|id| !sold_properties.contains(id))
            })
            .map(|income| income.amount)
            .sum();
        return monthly * 12.0;
    }

    let pension = settings.monthly_pension * 12.0;
    if age == settings.retirement_age {
        pension + settings.retirement_bonus
    } else {
        pension
    }
}

fn apply_education_costs(
    settings: &SimulationSettings,
    ledger: &mut YearLedger,
    years_since_start: u32,
) -> f64 {
    let mut total = 0.0;
    for (idx, child) in settings.children.iter().enumerate() {
        let child_age = child.age.saturating_add(years_since_start);
        let amount = annual_education_cost(child, child_age);
        if amount <= 0.0 {
            continue;
        }
        total += amount;
        ledger.breakdown.education.push(EducationCost {
            child: child
                .name
                .clone()
                .unwrap_or_else(|| format!("Child {}", idx + 1)),
            child_age,
            amount,
        });
    }
    ledger.breakdown.education_total = total;
    total
}

fn living_cost(settings: &SimulationSettings, age: u32, income: f64) -> f64 {
    if age >= settings.retirement_age {
        settings.post_retirement_monthly_spending * 12.0
    } else {
        income * PRE_RETIREMENT_LIVING_COST_RATIO
    }
}

fn apply_contribution_waterfall(
    settings: &SimulationSettings,
    state: &mut ProjectionState,
) -> Contributions {
    let growth = 1.0 + settings.annual_return_rate;
    let portfolio = &mut state.portfolio;
    let mut flow = Contributions::default();

    for step in CONTRIBUTION_WATERFALL {
        match step {
            ContributionStep::Nisa => {
                let desired = (settings.nisa_monthly_contribution * 12.0).max(0.0);
                let room = (settings.nisa_lifetime_limit - state.nisa_used_quota).max(0.0);
                let accepted = desired.min(room);
                let actual = accepted.min(portfolio.cash.max(0.0));
                portfolio.cash -= actual;
                portfolio.nisa = (portfolio.nisa + actual) * growth;
                state.nisa_used_quota += actual;
                flow.nisa = actual;
                flow.nisa_overflow = desired - accepted;
            }
            ContributionStep::Taxable => {
                let desired =
                    (settings.taxable_monthly_contribution * 12.0).max(0.0) + flow.nisa_overflow;
                let actual = desired.min(portfolio.cash.max(0.0));
                portfolio.cash -= actual;
                portfolio.taxable = (portfolio.taxable + actual) * growth;
                flow.taxable = actual;
            }
            ContributionStep::Ideco => {
                // Not capped at available cash; cash may go negative here.
                let actual = (settings.ideco_monthly_contribution * 12.0).max(0.0);
                portfolio.cash -= actual;
                portfolio.ideco = (portfolio.ideco + actual) * growth;
                flow.ideco = actual;
            }
            ContributionStep::GrowthOnly => {
                portfolio.metals *= growth;
                portfolio.crypto *= growth;
                portfolio.foreign *= 1.0 + settings.foreign_return_rate;
            }
        }
    }

    flow
}
