use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

// Use library instead of local modules
use country_ledger::{init_tracing, Config, CountryFilter, CountryService, SortOrder};

#[derive(Parser)]
#[command(name = "country-ledger", version, about = "Country data and exchange-rate ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch both external sources and reconcile them into the database
    Refresh,
    /// Row count and last refresh time
    Stats,
    /// Show one country (case-insensitive)
    Show { name: String },
    /// List countries
    List {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// name_asc (default), gdp_desc or gdp_asc
        #[arg(long)]
        sort: Option<String>,
    },
    /// Delete one country (case-insensitive)
    Delete { name: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let service = CountryService::from_config(&config)?;

    match cli.command {
        Command::Refresh => {
            let report = service.refresh_countries().await?;
            print_json(&report)?;
        }
        Command::Stats => print_json(&service.get_stats()?)?,
        Command::Show { name } => print_json(&service.get_country_by_name(&name)?)?,
        Command::List {
            region,
            currency,
            sort,
        } => {
            let filter = CountryFilter::new(region, currency, SortOrder::parse(sort.as_deref()));
            print_json(&service.list_countries(&filter)?)?;
        }
        Command::Delete { name } => {
            service.delete_country_by_name(&name)?;
            eprintln!("Deleted {}", name);
        }
    }

    Ok(())
}
