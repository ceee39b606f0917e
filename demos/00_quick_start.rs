/// quick start - minimal example to get started
use installment_loan_rs::{
    CreateLoanRequest, CurrencyCode, InMemoryLoanStore, LoanService, Money, RepayLoanRequest,
    SafeTimeProvider, TimeSource,
};
use chrono::{TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let service = LoanService::with_store(InMemoryLoanStore::new());

    // lend SGD 1,000.00 over 3 months
    let loan = service.create_loan(
        CreateLoanRequest {
            owner_id: "user-1".to_string(),
            amount: Money::from_minor(100_000),
            currency_code: CurrencyCode::sgd(),
            terms: 3,
            processed_at: "2024-01-01".to_string(),
        },
        &time,
    )?;

    // pay the first installment plus a little extra
    service.repay_loan(
        RepayLoanRequest {
            loan_id: loan.id,
            amount: Money::from_minor(40_000),
            currency_code: CurrencyCode::sgd(),
            received_at: "2024-02-01 09:30:00".to_string(),
        },
        &time,
    )?;

    // print current state
    println!("{}", service.loan_view(loan.id)?.to_json_pretty()?);

    Ok(())
}
