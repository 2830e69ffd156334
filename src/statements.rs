use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::balance::get_balance;
use crate::error::{PennyError, Result};
use crate::models::{list_accounts, Account, AccountSubType, AccountType};

/// Earliest date used for "full history" aggregations. Dates are stored as
/// ISO text, so the bounds must stay four-digit years to compare correctly.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).expect("valid date")
}

/// Latest date used for "full history" aggregations.
pub fn far_future() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).expect("valid date")
}

/// One aggregated line of a statement. Synthetic lines ("Realized Net
/// Income") carry no account type or sub type.
#[derive(Debug, Clone)]
pub struct Balance {
    pub account: String,
    pub account_type: Option<AccountType>,
    pub sub_type: Option<AccountSubType>,
    pub amount: Decimal,
}

/// How a metric's value should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Money,
    Percent,
    Ratio,
}

/// A named derived value; `None` means the computation had a zero
/// denominator (or a missing account) and is reported as such, never
/// defaulted.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub value: Option<Decimal>,
    pub unit: MetricUnit,
}

impl Metric {
    pub fn money(name: &'static str, value: Option<Decimal>) -> Self {
        Metric { name, value, unit: MetricUnit::Money }
    }

    pub fn percent(name: &'static str, value: Option<Decimal>) -> Self {
        Metric { name, value, unit: MetricUnit::Percent }
    }

    pub fn ratio(name: &'static str, value: Option<Decimal>) -> Self {
        Metric { name, value, unit: MetricUnit::Ratio }
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Closed accounts with a zero balance are hidden from statements but
/// never deleted.
fn is_visible(account: &Account, amount: Decimal) -> bool {
    !(account.is_closed && amount.is_zero())
}

fn account_balances(
    conn: &Connection,
    types: &[AccountType],
    end_date: NaiveDate,
    start_date: Option<NaiveDate>,
) -> Result<Vec<Balance>> {
    let mut balances = Vec::new();
    for account in list_accounts(conn)? {
        if !types.contains(&account.account_type) {
            continue;
        }
        let amount = get_balance(conn, &account, end_date, start_date)?;
        if !is_visible(&account, amount) {
            continue;
        }
        balances.push(Balance {
            account: account.name.clone(),
            account_type: Some(account.account_type),
            sub_type: Some(account.sub_type),
            amount,
        });
    }
    Ok(balances)
}

fn sum_where(balances: &[Balance], pred: impl Fn(&Balance) -> bool) -> Decimal {
    balances.iter().filter(|b| pred(b)).map(|b| b.amount).sum()
}

// ---------------------------------------------------------------------------
// Income statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IncomeStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub balances: Vec<Balance>,
    /// Income excluding unrealized gains, minus expenses.
    pub realized_net_income: Decimal,
    pub unrealized_gains_and_losses: Decimal,
    pub net_income: Decimal,
    pub taxable_income: Decimal,
    pub tax_rate: Option<Decimal>,
    pub savings_rate: Option<Decimal>,
}

impl IncomeStatement {
    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric::money("Net Income", Some(self.net_income)),
            Metric::money("Taxable Income", Some(self.taxable_income)),
            Metric::percent("Tax Rate", self.tax_rate),
            Metric::percent("Savings Rate", self.savings_rate),
            Metric::money("Unrealized Gains/Losses", Some(self.unrealized_gains_and_losses)),
        ]
    }
}

pub fn get_income_statement(
    conn: &Connection,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<IncomeStatement> {
    let mut balances = account_balances(
        conn,
        &[AccountType::Income, AccountType::Expense],
        end_date,
        Some(start_date),
    )?;

    let unrealized = sum_where(&balances, |b| {
        b.sub_type == Some(AccountSubType::UnrealizedInvestmentGains)
    });
    let income_ex_unrealized = sum_where(&balances, |b| {
        b.account_type == Some(AccountType::Income)
            && b.sub_type != Some(AccountSubType::UnrealizedInvestmentGains)
    });
    let expenses = sum_where(&balances, |b| b.account_type == Some(AccountType::Expense));
    let taxes = sum_where(&balances, |b| b.sub_type == Some(AccountSubType::Tax));
    let taxable_base = sum_where(&balances, |b| {
        matches!(
            b.sub_type,
            Some(AccountSubType::Salary) | Some(AccountSubType::DividendsAndInterest)
        )
    });

    let realized_net_income = income_ex_unrealized - expenses;
    balances.push(Balance {
        account: "Realized Net Income".to_string(),
        account_type: None,
        sub_type: None,
        amount: realized_net_income,
    });

    let taxable_income = taxable_base - taxes;
    Ok(IncomeStatement {
        start_date,
        end_date,
        balances,
        realized_net_income,
        unrealized_gains_and_losses: unrealized,
        net_income: realized_net_income + unrealized,
        taxable_income,
        tax_rate: ratio(taxes, taxable_income),
        savings_rate: ratio(realized_net_income, income_ex_unrealized),
    })
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BalanceSheet {
    pub end_date: NaiveDate,
    pub balances: Vec<Balance>,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
    pub cash: Decimal,
    pub liquid_assets: Decimal,
    pub cash_percent_assets: Option<Decimal>,
    pub debt_to_equity: Option<Decimal>,
    pub liquid_assets_percent: Option<Decimal>,
}

impl BalanceSheet {
    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric::money("Total Assets", Some(self.total_assets)),
            Metric::money("Total Liabilities", Some(self.total_liabilities)),
            Metric::money("Total Equity", Some(self.total_equity)),
            Metric::percent("Cash % Assets", self.cash_percent_assets),
            Metric::ratio("Debt to Equity", self.debt_to_equity),
            Metric::money("Liquid Assets", Some(self.liquid_assets)),
            Metric::percent("Liquid Assets %", self.liquid_assets_percent),
        ]
    }

    /// Balance of one sub type on this sheet.
    pub fn sub_type_total(&self, sub_type: AccountSubType) -> Decimal {
        sum_where(&self.balances, |b| b.sub_type == Some(sub_type))
    }
}

pub fn get_balance_sheet(conn: &Connection, end_date: NaiveDate) -> Result<BalanceSheet> {
    let mut balances = account_balances(
        conn,
        &[AccountType::Asset, AccountType::Liability, AccountType::Equity],
        end_date,
        None,
    )?;

    // Lifetime earnings fold into the equity side as two synthetic lines.
    let lifetime = get_income_statement(conn, epoch(), end_date)?;
    balances.push(Balance {
        account: "Net Retained Earnings".to_string(),
        account_type: Some(AccountType::Equity),
        sub_type: None,
        amount: lifetime.realized_net_income,
    });
    balances.push(Balance {
        account: "Investment Gains/Losses".to_string(),
        account_type: Some(AccountType::Equity),
        sub_type: None,
        amount: lifetime.unrealized_gains_and_losses,
    });

    let total_assets = sum_where(&balances, |b| b.account_type == Some(AccountType::Asset));
    let total_liabilities =
        sum_where(&balances, |b| b.account_type == Some(AccountType::Liability));
    let total_equity = sum_where(&balances, |b| b.account_type == Some(AccountType::Equity));
    let cash = sum_where(&balances, |b| b.sub_type == Some(AccountSubType::Cash));
    let securities_unrestricted = sum_where(&balances, |b| {
        b.sub_type == Some(AccountSubType::SecuritiesUnrestricted)
    });
    let liquid_assets = cash + securities_unrestricted;

    Ok(BalanceSheet {
        end_date,
        total_assets,
        total_liabilities,
        total_equity,
        cash,
        liquid_assets,
        cash_percent_assets: ratio(cash, total_assets),
        debt_to_equity: ratio(total_liabilities, total_equity),
        liquid_assets_percent: ratio(liquid_assets, total_assets),
        balances,
    })
}

// ---------------------------------------------------------------------------
// Cash flow statement (balance-sheet-delta method)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CashFlowStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub operating: Decimal,
    pub investing: Decimal,
    pub financing: Decimal,
    pub net_cash_flow: Decimal,
    /// End cash minus start cash; must equal `net_cash_flow` on an
    /// uncorrupted ledger.
    pub cash_delta: Decimal,
    pub levered_after_tax: Decimal,
    pub levered_after_tax_post_retirement: Decimal,
}

impl CashFlowStatement {
    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric::money("Operating", Some(self.operating)),
            Metric::money("Investing", Some(self.investing)),
            Metric::money("Financing", Some(self.financing)),
            Metric::money("Net Cash Flow", Some(self.net_cash_flow)),
            Metric::money("Levered After-Tax", Some(self.levered_after_tax)),
            Metric::money(
                "Levered After-Tax (Post-Retirement)",
                Some(self.levered_after_tax_post_retirement),
            ),
        ]
    }
}

/// Derive the cash flow statement from an income statement and the two
/// bracketing balance sheets, so the three views reconcile exactly.
pub fn cash_flow_from_parts(
    income: &IncomeStatement,
    start_sheet: &BalanceSheet,
    end_sheet: &BalanceSheet,
) -> CashFlowStatement {
    let delta =
        |st: AccountSubType| end_sheet.sub_type_total(st) - start_sheet.sub_type_total(st);

    let securities_delta = delta(AccountSubType::SecuritiesRetirement)
        + delta(AccountSubType::SecuritiesUnrestricted);

    let operating = income.realized_net_income
        + delta(AccountSubType::TaxesPayable)
        + delta(AccountSubType::ShortTermDebt);
    let financing = delta(AccountSubType::LongTermDebt);
    // Asset growth consumes cash, hence the sign flips; unrealized gains
    // inside the securities delta never moved cash and are added back.
    let investing = -delta(AccountSubType::RealEstate) - securities_delta
        + income.unrealized_gains_and_losses;

    let levered_after_tax = operating + financing;
    CashFlowStatement {
        start_date: income.start_date,
        end_date: income.end_date,
        operating,
        investing,
        financing,
        net_cash_flow: operating + investing + financing,
        cash_delta: delta(AccountSubType::Cash),
        levered_after_tax,
        levered_after_tax_post_retirement: levered_after_tax
            - delta(AccountSubType::SecuritiesRetirement),
    }
}

pub fn get_cash_flow(
    conn: &Connection,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<CashFlowStatement> {
    let day_before = start_date
        .pred_opt()
        .ok_or_else(|| PennyError::BadDate(start_date.to_string()))?;
    let income = get_income_statement(conn, start_date, end_date)?;
    let start_sheet = get_balance_sheet(conn, day_before)?;
    let end_sheet = get_balance_sheet(conn, end_date)?;
    Ok(cash_flow_from_parts(&income, &start_sheet, &end_sheet))
}

/// Full-history residual between the derived net cash flow and total cash.
/// Nonzero means some ledger movement escaped the modeled categories, a
/// sentinel for corruption. Reported as `None` when no equity account
/// exists to anchor the starting position.
pub fn get_global_discrepancy(conn: &Connection) -> Result<Option<Decimal>> {
    let has_equity = list_accounts(conn)?
        .iter()
        .any(|a| a.account_type == AccountType::Equity);
    if !has_equity {
        return Ok(None);
    }
    let income = get_income_statement(conn, epoch(), far_future())?;
    let start_sheet = get_balance_sheet(conn, epoch())?;
    let end_sheet = get_balance_sheet(conn, far_future())?;
    let flow = cash_flow_from_parts(&income, &start_sheet, &end_sheet);
    Ok(Some(flow.net_cash_flow - flow.cash_delta))
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrendPoint {
    pub year: i32,
    pub month: u32,
    pub amount: Decimal,
}

fn month_start(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PennyError::BadDate(format!("{year:04}-{month:02}")))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Calendar-month balances for one account: a pure composition of the
/// balance calculator.
pub fn get_trend(
    conn: &Connection,
    account: &Account,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<TrendPoint>> {
    if start_date > end_date {
        return Err(PennyError::BadDate(format!(
            "{start_date} is after {end_date}"
        )));
    }
    let mut points = Vec::new();
    let (mut year, mut month) = (start_date.year(), start_date.month());
    let last = (end_date.year(), end_date.month());
    loop {
        let first = month_start(year, month)?;
        let (ny, nm) = next_month(year, month);
        let month_end = month_start(ny, nm)?
            .pred_opt()
            .ok_or_else(|| PennyError::BadDate(format!("{year:04}-{month:02}")))?;
        let amount = get_balance(conn, account, month_end, Some(first))?;
        points.push(TrendPoint { year, month, amount });
        if (year, month) == last {
            break;
        }
        (year, month) = (ny, nm);
    }
    Ok(points)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
