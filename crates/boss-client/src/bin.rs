use boss_client::cli::commands;
use boss_client::cli::{parse_cli, Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("boss: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = commands::connect(&cli.global)?;

    match cli.command {
        Commands::Log => commands::log(&client).await?,
        Commands::List { long } => commands::list(&client, long).await?,
        Commands::Catalog { long } => commands::catalog(&client, long).await?,
        Commands::Create {
            service_plan,
            id,
            follow,
            wait,
        } => commands::create(&client, &service_plan, id, follow, wait).await?,
        Commands::Update {
            instance,
            service_plan,
        } => commands::update(&client, &instance, &service_plan).await?,
        Commands::Delete { instance } => commands::delete(&client, &instance).await?,
        Commands::Task { instance, follow } => commands::task(&client, &instance, follow).await?,
        Commands::Manifest { instance } => commands::manifest(&client, &instance).await?,
        Commands::Creds { instance, json } => commands::creds(&client, &instance, json).await?,
        Commands::Redeploy { instance } => commands::redeploy(&client, &instance).await?,
    }

    Ok(())
}
