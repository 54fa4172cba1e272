use anyhow::{anyhow, Result};
use std::path::PathBuf;
use structopt::StructOpt;
use xbrl_statements::statements::SearchQuery;
use xbrl_statements::{ExtractorConfig, Financials, Statement};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "xbrl-statements",
    about = "Reconstruct financial statements from a local XBRL filing"
)]
struct Opt {
    /// Directory holding the schema, linkbases and instance document
    #[structopt(parse(from_os_str))]
    dir: PathBuf,

    /// Only print this statement (balancesheet, cashflows, operations, parenthetical)
    #[structopt(short, long)]
    statement: Option<Statement>,

    /// Search words, e.g. "net cash provided by operating activities"
    #[structopt(long)]
    search: Option<String>,

    /// Preferred depth of the search match
    #[structopt(long)]
    level: Option<usize>,

    /// Skip line items containing any of these words
    #[structopt(long)]
    exclude: Vec<String>,

    /// Context id to read values from instead of the default one
    #[structopt(long)]
    context: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    if !opt.dir.is_dir() {
        eprintln!("Filing directory does not exist: {:?}", opt.dir);
        std::process::exit(1);
    }

    let config = ExtractorConfig::from_env()?;
    let financials = Financials::from_dir(&opt.dir, &config)?;
    for (statement, err) in &financials.failures {
        eprintln!("{}: {}", statement, err);
    }

    if let Some(words) = &opt.search {
        let statement = opt.statement.unwrap_or(Statement::BalanceSheet);
        let mut query = SearchQuery::phrase(words).exclude(&opt.exclude);
        if let Some(level) = opt.level {
            query = query.level(level);
        }
        if let Some(context) = &opt.context {
            query = query.in_context(context.as_str());
        }

        let hit = financials
            .search(statement, &query)
            .map_err(|e| anyhow!("{}: {}", statement, e))?;
        println!("{}", serde_json::to_string_pretty(&hit)?);
        return Ok(());
    }

    match opt.statement {
        Some(statement) => {
            let report = financials.statement(statement)?;
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        None => println!("{}", serde_json::to_string_pretty(&financials)?),
    }
    Ok(())
}
