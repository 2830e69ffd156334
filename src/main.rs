mod amortize;
mod balance;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod journal;
mod models;
mod plugger;
mod receivables;
mod settings;
mod statements;
mod tax;
#[cfg(test)]
mod testutil;

use clap::Parser;

use cli::{
    AccountsCommands, AmortizeCommands, Cli, Commands, EntitiesCommands, ReceivablesCommands,
    ReportCommands, TaxCommands, TxCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                sub_type,
            } => cli::accounts::add(&name, &account_type, &sub_type),
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::Close { name } => cli::accounts::close(&name),
        },
        Commands::Entities { command } => match command {
            EntitiesCommands::Add { name } => cli::entities::add(&name),
            EntitiesCommands::List => cli::entities::list(),
        },
        Commands::Tx { command } => match command {
            TxCommands::Add {
                account,
                amount,
                date,
                description,
                txn_type,
            } => cli::tx::add(
                &account,
                &amount,
                date.as_deref(),
                &description,
                txn_type.as_deref(),
            ),
            TxCommands::List { open } => cli::tx::list(open),
            TxCommands::Link { a, b } => cli::tx::link(a, b),
        },
        Commands::Entry {
            transaction_id,
            debits,
            credits,
        } => cli::entry::save(transaction_id, &debits, &credits),
        Commands::Import { file, account } => cli::import::run(&file, &account),
        Commands::Report { command } => match command {
            ReportCommands::Income { from, to } => {
                cli::report::income(from.as_deref(), to.as_deref())
            }
            ReportCommands::BalanceSheet { date } => cli::report::balance_sheet(date.as_deref()),
            ReportCommands::Cashflow { from, to } => {
                cli::report::cashflow(&from, to.as_deref())
            }
            ReportCommands::Trend { account, from, to } => {
                cli::report::trend(&account, &from, to.as_deref())
            }
        },
        Commands::Reconcile {
            account,
            date,
            amount,
            restate,
        } => cli::reconcile::run(&account, &date, &amount, restate),
        Commands::Amortize { command } => match command {
            AmortizeCommands::Add {
                transaction_id,
                periods,
                account,
            } => cli::amortize::add(transaction_id, periods, &account),
            AmortizeCommands::Run { id, date } => cli::amortize::run(id, date.as_deref()),
            AmortizeCommands::List { all } => cli::amortize::list(all),
        },
        Commands::Tax { command } => match command {
            TaxCommands::Charge {
                charge_type,
                date,
                amount,
                restate,
            } => cli::tax::charge(&charge_type, &date, &amount, restate),
            TaxCommands::List => cli::tax::list(),
        },
        Commands::Receivables { command } => match command {
            ReceivablesCommands::List => cli::receivables::list(),
            ReceivablesCommands::History { entity } => cli::receivables::history(&entity),
            ReceivablesCommands::Untagged => cli::receivables::untagged(),
            ReceivablesCommands::Tag { item, entity } => cli::receivables::tag(item, &entity),
            ReceivablesCommands::Untag { item } => cli::receivables::untag(item),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
