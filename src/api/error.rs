use thiserror::Error;

use crate::core::{MAX_AGE, MAX_LOAN_YEARS};

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("invalid request JSON: {0}")]
    InvalidJson(String),
    #[error("targetAge ({target}) must be >= currentAge ({current})")]
    InvalidAgeRange { current: u32, target: u32 },
    #[error("{field} ({value}) must be <= {max}", max = MAX_AGE)]
    AgeOutOfRange { field: &'static str, value: u32 },
    #[error("homeLoanYears ({0}) must be <= {max}", max = MAX_LOAN_YEARS)]
    LoanTermOutOfRange(u32),
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be >= 0")]
    Negative { field: &'static str },
    #[error("{field} must be > -100 percent")]
    InvalidRate { field: &'static str },
    #[error("nisaUsedQuota ({used}) must not exceed nisaLifetimeLimit ({limit})")]
    NisaQuotaExceeded { used: f64, limit: f64 },
    #[error("homeDownPayment must not exceed homePrice")]
    DownPaymentExceedsPrice,
    #[error("homeSaleTarget refers to unknown property '{0}'")]
    UnknownSaleTarget(String),
    #[error("loan '{name}': {reason}")]
    InvalidLoan { name: String, reason: &'static str },
    #[error("no exchange rate supplied for currency '{0}'")]
    MissingExchangeRate(String),
}
