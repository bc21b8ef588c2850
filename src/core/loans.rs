use super::types::{ExtraRepayment, Loan, LoanStatus};

const MONTHS_PER_YEAR: u32 = 12;
/// Balances at or below this are rounding residue and count as repaid.
const BALANCE_EPSILON: f64 = 1e-3;
/// Longest mortgage term accepted at the request boundary.
pub const MAX_LOAN_YEARS: u32 = 100;

/// Fixed monthly payment that amortizes `principal` over `years` at `annual_rate`.
pub fn annuity_payment(principal: f64, annual_rate: f64, years: u32) -> f64 {
    let principal = principal.max(0.0);
    let months = years.saturating_mul(MONTHS_PER_YEAR);
    if months == 0 {
        return principal;
    }

    let r = annual_rate / MONTHS_PER_YEAR as f64;
    if r.abs() < 1e-12 {
        return principal / months as f64;
    }

    let growth = (1.0 + r).powf(months as f64);
    if !growth.is_finite() {
        // Term long enough that the payment converges to interest only.
        return principal * r;
    }
    principal * r * growth / (growth - 1.0)
}

/// Working copy of a loan, local to one projection run.
#[derive(Debug, Clone)]
pub struct LoanState {
    pub id: Option<String>,
    pub name: String,
    pub balance: f64,
    pub monthly_payment: f64,
    pub monthly_rate: f64,
    extra_repayments: Vec<ExtraRepayment>,
    stall_reported: bool,
}

impl LoanState {
    pub fn from_record(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            name: loan.name.clone(),
            balance: loan.balance.max(0.0),
            monthly_payment: loan.monthly_payment.max(0.0),
            monthly_rate: loan.interest_rate / 100.0 / MONTHS_PER_YEAR as f64,
            extra_repayments: loan.extra_repayments.clone(),
            stall_reported: false,
        }
    }

    pub fn mortgage(name: &str, principal: f64, annual_rate: f64, years: u32) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            balance: principal.max(0.0),
            monthly_payment: annuity_payment(principal, annual_rate, years),
            monthly_rate: annual_rate / MONTHS_PER_YEAR as f64,
            extra_repayments: Vec::new(),
            stall_reported: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.balance > BALANCE_EPSILON
    }

    pub fn status(&self) -> LoanStatus {
        if !self.is_open() {
            LoanStatus::PaidOff
        } else if self.monthly_payment <= self.balance * self.monthly_rate {
            LoanStatus::Stalled
        } else {
            LoanStatus::Active
        }
    }

    /// Applies every extra repayment scheduled for `age`. Each payment is capped
    /// at the remaining balance and at the cash still available.
    pub fn apply_extra_repayment(&mut self, age: u32, available_cash: f64) -> f64 {
        let mut available = available_cash.max(0.0);
        let mut paid = 0.0;
        for extra in self.extra_repayments.iter().filter(|e| e.age == age) {
            if !self.is_open() {
                break;
            }
            let requested = if extra.is_full_payoff {
                self.balance
            } else {
                extra.amount.max(0.0)
            };
            let amount = requested.min(self.balance).min(available);
            self.balance -= amount;
            available -= amount;
            paid += amount;
        }
        paid
    }

    /// Repays as much of the balance as `available_cash` allows.
    pub fn repay_in_full(&mut self, available_cash: f64) -> f64 {
        let amount = self.balance.min(available_cash.max(0.0));
        self.balance -= amount;
        amount
    }

    /// Runs one year of monthly amortization and returns the total paid.
    pub fn amortize_year(&mut self) -> f64 {
        if self.status() == LoanStatus::Stalled && !self.stall_reported {
            log::warn!(
                "loan '{}' payment {:.0} does not cover monthly interest on {:.0}",
                self.name,
                self.monthly_payment,
                self.balance
            );
            self.stall_reported = true;
        }

        let mut paid = 0.0;
        for _ in 0..MONTHS_PER_YEAR {
            if !self.is_open() {
                break;
            }
            let due = self.balance + self.balance * self.monthly_rate;
            let payment = if due - self.monthly_payment <= BALANCE_EPSILON {
                due
            } else {
                self.monthly_payment
            };
            self.balance = (due - payment).max(0.0);
            paid += payment;
        }
        paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn loan(balance: f64, monthly_payment: f64, interest_rate: f64) -> Loan {
        Loan {
            name: "car".to_string(),
            balance,
            monthly_payment,
            interest_rate,
            ..Loan::default()
        }
    }

    #[test]
    fn annuity_payment_zero_rate_is_straight_line() {
        assert_approx(annuity_payment(1_200_000.0, 0.0, 1), 100_000.0);
        assert_approx(annuity_payment(36_000_000.0, 0.0, 30), 100_000.0);
    }

    #[test]
    fn annuity_payment_matches_hand_calculation() {
        // 1,000,000 over 1 year at 12%: r = 0.01, n = 12 -> 88,848.79
        let payment = annuity_payment(1_000_000.0, 0.12, 1);
        assert!((payment - 88_848.7886).abs() < 1e-3, "got {payment}");
    }

    #[test]
    fn annuity_payment_fully_amortizes_mortgage() {
        let mut state = LoanState::mortgage("home", 30_000_000.0, 0.015, 35);
        for _ in 0..35 {
            state.amortize_year();
        }
        assert!(state.balance.abs() < 1e-3, "residual {}", state.balance);
    }

    #[test]
    fn final_payment_absorbs_rounding_residue() {
        let mut state = LoanState::mortgage("home", 30_000_000.0, 0.005, 20);
        for _ in 0..20 {
            state.amortize_year();
        }
        assert_eq!(state.balance, 0.0);
        assert!(!state.is_open());
        assert_eq!(state.status(), LoanStatus::PaidOff);
        assert_approx(state.amortize_year(), 0.0);
    }

    #[test]
    fn annuity_payment_handles_extreme_terms() {
        let payment = annuity_payment(30_000_000.0, 0.01, u32::MAX);
        assert!(payment.is_finite());
        assert!((payment - 25_000.0).abs() < 1e-6, "got {payment}");
        let payment = annuity_payment(30_000_000.0, 0.0, 400_000_000);
        assert!(payment.is_finite() && payment > 0.0);
    }

    #[test]
    fn zero_rate_loan_pays_off_in_one_year() {
        let mut state = LoanState::from_record(&loan(1_200_000.0, 100_000.0, 0.0));
        let paid = state.amortize_year();
        assert_approx(paid, 1_200_000.0);
        assert_approx(state.balance, 0.0);
        assert_eq!(state.status(), LoanStatus::PaidOff);
        assert_approx(state.amortize_year(), 0.0);
    }

    #[test]
    fn final_month_payment_is_clamped_to_remaining_balance() {
        let mut state = LoanState::from_record(&loan(250_000.0, 100_000.0, 0.0));
        assert_approx(state.amortize_year(), 250_000.0);
        assert_approx(state.balance, 0.0);
    }

    #[test]
    fn extra_repayment_is_capped_by_cash_and_balance() {
        let mut record = loan(1_000_000.0, 10_000.0, 0.0);
        record.extra_repayments = vec![
            ExtraRepayment {
                age: 40,
                amount: 300_000.0,
                is_full_payoff: false,
            },
            ExtraRepayment {
                age: 41,
                amount: 0.0,
                is_full_payoff: true,
            },
        ];
        let mut state = LoanState::from_record(&record);

        assert_approx(state.apply_extra_repayment(39, 1e9), 0.0);
        assert_approx(state.apply_extra_repayment(40, 200_000.0), 200_000.0);
        assert_approx(state.balance, 800_000.0);
        assert_approx(state.apply_extra_repayment(41, 1e9), 800_000.0);
        assert_eq!(state.status(), LoanStatus::PaidOff);
    }

    #[test]
    fn extra_repayment_ignores_negative_cash() {
        let mut record = loan(1_000_000.0, 10_000.0, 0.0);
        record.extra_repayments = vec![ExtraRepayment {
            age: 40,
            amount: 0.0,
            is_full_payoff: true,
        }];
        let mut state = LoanState::from_record(&record);
        assert_approx(state.apply_extra_repayment(40, -5_000.0), 0.0);
        assert_approx(state.balance, 1_000_000.0);
    }

    #[test]
    fn payment_below_interest_is_reported_as_stalled() {
        // 12% annual -> 1% monthly on 1,000,000 = 10,000 interest
        let mut state = LoanState::from_record(&loan(1_000_000.0, 5_000.0, 12.0));
        assert_eq!(state.status(), LoanStatus::Stalled);
        let paid = state.amortize_year();
        assert_approx(paid, 60_000.0);
        assert!(state.balance > 1_000_000.0);
        assert_eq!(state.status(), LoanStatus::Stalled);
    }

    #[test]
    fn record_is_not_mutated_by_working_copy() {
        let record = loan(500_000.0, 100_000.0, 0.0);
        let mut state = LoanState::from_record(&record);
        state.amortize_year();
        assert_approx(record.balance, 500_000.0);
    }
}
