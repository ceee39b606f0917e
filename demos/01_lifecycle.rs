/// lifecycle - a loan from disbursement to settlement
use installment_loan_rs::{
    CreateLoanRequest, CurrencyCode, Event, InMemoryLoanStore, LoanError, LoanService,
    LoanServiceConfig, Money, SafeTimeProvider, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let config = LoanServiceConfig::from_env()?;
    let service = LoanService::new(InMemoryLoanStore::new(), config)?;
    let currency = CurrencyCode::sgd();

    // 1. disbursement, on the 31st to show month-end clamping
    println!("1. disbursement");
    println!("---------------");
    let loan = service.create_loan(
        CreateLoanRequest {
            owner_id: "user-42".to_string(),
            amount: Money::from_minor(120_000),
            currency_code: currency.clone(),
            terms: 4,
            processed_at: "2024-01-31T00:00:00Z".to_string(),
        },
        &time,
    )?;
    println!("  loan {} for {} {}", loan.id, loan.amount.to_major(&currency), currency);
    for installment in service.schedule(loan.id)? {
        println!(
            "  #{} due {}: {}",
            installment.installment_number,
            installment.due_date,
            installment.amount.to_major(&currency)
        );
    }

    // 2. servicing, one payment a month of varying size
    println!("\n2. servicing");
    println!("------------");
    for minor in [30_000, 20_000, 45_000] {
        controller.advance(Duration::days(30));
        service.repay_loan_now(loan.id, Money::from_minor(minor), currency.clone(), &time)?;

        let loan = service.loan(loan.id)?;
        println!(
            "  {}: paid {}, outstanding {}",
            time.now().format("%Y-%m-%d"),
            Money::from_minor(minor).to_major(&currency),
            loan.outstanding_amount.to_major(&currency)
        );
    }
    for installment in service.schedule(loan.id)? {
        println!(
            "  #{} {} outstanding {}",
            installment.installment_number,
            installment.status,
            installment.outstanding_amount.to_major(&currency)
        );
    }

    // 3. paying more than is owed is rejected whole
    println!("\n3. overpayment");
    println!("--------------");
    match service.repay_loan_now(loan.id, Money::from_minor(50_000), currency.clone(), &time) {
        Err(LoanError::OverpaymentUnallocated { unallocated, .. }) => {
            println!("  rejected, {} would be unallocated", unallocated.to_major(&currency));
        }
        other => println!("  unexpected: {:?}", other),
    }

    // 4. settlement
    println!("\n4. settlement");
    println!("-------------");
    let outstanding = service.loan(loan.id)?.outstanding_amount;
    service.repay_loan_now(loan.id, outstanding, currency.clone(), &time)?;
    let loan = service.loan(loan.id)?;
    println!("  status: {}", loan.status);

    let events = service.take_events();
    let repaid = events.iter().filter(|e| matches!(e, Event::LoanRepaid { .. })).count();
    println!("\n{} events recorded, loan repaid {} time(s)", events.len(), repaid);

    Ok(())
}
