//! stockroom-client CLI entry point.

use clap::Parser;

use stockroom_client::cli::loadtest::LoadtestCommand;
use stockroom_client::cli::records::{RecordAction, RecordCommand};
use stockroom_client::cli::{Cli, Commands, KindArg, OutputFormat};
use stockroom_client::client::loadtest::LoadTest;
use stockroom_client::client::StockroomClient;
use stockroom_client::output::{format_output, pretty};
use stockroom_client::ClientError;
use stockroom_core::record::{Channel, Location, PageQuery, Record, RecordFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = StockroomClient::new(&cli.base_url);

    match cli.command {
        Commands::Channel(ref cmd) => run_record::<Channel>(&client, &cli, cmd).await?,
        Commands::Location(ref cmd) => run_record::<Location>(&client, &cli, cmd).await?,
        Commands::Ping => {
            let pong = client.ping().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&pong, cli.format)),
                OutputFormat::Pretty => println!("{}", pong.message),
            }
        }
        Commands::Loadtest(ref cmd) => match cmd.kind {
            KindArg::Channel => run_loadtest::<Channel>(&client, &cli, cmd).await?,
            KindArg::Location => run_loadtest::<Location>(&client, &cli, cmd).await?,
        },
    }

    Ok(())
}

async fn run_record<R: Record>(
    client: &StockroomClient,
    cli: &Cli,
    cmd: &RecordCommand,
) -> Result<(), ClientError> {
    match &cmd.action {
        RecordAction::Upsert { inputs, policy } => {
            match client.upsert::<R>((*policy).into(), inputs).await {
                Ok(summary) => match cli.format {
                    OutputFormat::Json => println!("{}", format_output(&summary, cli.format)),
                    OutputFormat::Pretty => println!("{}", pretty::format_summary(&summary)),
                },
                Err(ClientError::UpsertFailed { outputs }) => {
                    match cli.format {
                        OutputFormat::Json => println!("{}", format_output(&outputs, cli.format)),
                        OutputFormat::Pretty => println!("{}", pretty::format_outputs(&outputs)),
                    }
                    return Err(ClientError::UpsertFailed { outputs });
                }
                Err(e) => return Err(e),
            }
        }
        RecordAction::Get { id } => {
            let record = client.get::<R>(*id).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&record, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_record(&record)),
            }
        }
        RecordAction::Filter { ids, codes } => {
            let filter = RecordFilter {
                ids: ids.clone(),
                codes: codes.clone(),
            };
            let records = client.filter::<R>(&filter).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&records, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_records(&records)),
            }
        }
        RecordAction::Page { page, limit, codes } => {
            let filter = RecordFilter::by_codes(codes.iter().cloned());
            let query = PageQuery {
                page: *page,
                limit: *limit,
            };
            let page = client.page::<R>(&filter, query).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_output(&page, cli.format)),
                OutputFormat::Pretty => println!("{}", pretty::format_page(&page)),
            }
        }
        RecordAction::Delete { ids } => {
            client.delete::<R>(ids.clone()).await?;
            if !cli.quiet {
                println!("Deleted {} {}(s)", ids.len(), R::KIND);
            }
        }
    }

    Ok(())
}

async fn run_loadtest<R: Record>(
    client: &StockroomClient,
    cli: &Cli,
    cmd: &LoadtestCommand,
) -> Result<(), ClientError> {
    let test = LoadTest {
        policy: cmd.policy.into(),
        vus: cmd.vus,
        iterations: cmd.iterations,
    };

    if !cli.quiet {
        eprintln!(
            "Running {} x {} upserts against /api/{}...",
            test.vus,
            test.iterations,
            R::KIND
        );
    }

    let report = client.load_test::<R>(test).await?;
    match cli.format {
        OutputFormat::Json => println!("{}", format_output(&report, cli.format)),
        OutputFormat::Pretty => println!("{}", pretty::format_report(&report)),
    }

    if report.failed > 0 {
        return Err(ClientError::ServerError {
            status: 0,
            message: format!("{} of {} requests failed", report.failed, report.requests),
        });
    }
    Ok(())
}
