mod education;
mod engine;
mod loans;
mod types;

pub use education::{
    EducationBand, EducationCourse, STUDY_ABROAD_ANNUAL_SURCHARGE, annual_education_cost,
};
pub use engine::{MAX_AGE, project};
pub use loans::{LoanState, MAX_LOAN_YEARS, annuity_payment};
pub use types::{
    Child, Contributions, CustomEducationCosts, EducationCost, ExtraRepayment, HomePlan, Income,
    Loan, LoanPayment, LoanPaymentKind, LoanStatus, Property, PropertySale, SaleTarget,
    SimulationSettings, YearBreakdown, YearSnapshot,
};
