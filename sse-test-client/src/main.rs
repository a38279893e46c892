use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use output::print_test_summary;
use sse_client::{Connection, TestUser};

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "SSE Integration Testing Tool for the chat relay")]
struct Cli {
    /// Base URL of the relay (e.g., http://localhost:4000)
    #[arg(long, default_value = "http://localhost:4000")]
    base_url: String,

    /// Channel the test users subscribe to
    #[arg(long, default_value = "general")]
    channel: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Subscribe two users and verify their connect snapshots
    ConnectionTest,
    /// Publish a message and verify every subscriber receives it
    MessageBroadcast,
    /// Create and delete a channel and verify the directory broadcasts
    ChannelLifecycle,
    /// Join and leave through channel-admin and verify presence events
    PresenceRoster,
    /// Run every scenario in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let user1 = TestUser::new("Ada");
    let user2 = TestUser::new("Grace");

    println!("{} Checking the relay is up...", "→".blue());
    let api_client = ApiClient::new(reqwest::Client::new(), cli.base_url.clone());
    api_client.health_check().await?;
    println!("{} Relay answered the health check", "✓".green());

    println!(
        "\n{} Establishing SSE connections on {}...",
        "→".blue(),
        cli.channel
    );
    let mut sse1 = Connection::establish(&cli.base_url, &cli.channel, &user1).await?;
    let mut sse2 = Connection::establish(&cli.base_url, &cli.channel, &user2).await?;
    println!("{} {} connected", "✓".green(), sse1.user_label);
    println!("{} {} connected", "✓".green(), sse2.user_label);

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            results.push(
                scenarios::test_connection(&cli.channel, &user1, &user2, &mut sse1, &mut sse2)
                    .await?,
            );
        }
        ScenarioChoice::MessageBroadcast => {
            results.push(
                scenarios::test_message_broadcast(
                    &cli.channel,
                    &user1,
                    &api_client,
                    &mut sse1,
                    &mut sse2,
                )
                .await?,
            );
        }
        ScenarioChoice::ChannelLifecycle => {
            results.push(scenarios::test_channel_lifecycle(&api_client, &mut sse1).await?);
        }
        ScenarioChoice::PresenceRoster => {
            results
                .push(scenarios::test_presence_roster(&cli.channel, &api_client, &mut sse1).await?);
        }
        ScenarioChoice::All => {
            results.push(
                scenarios::test_connection(&cli.channel, &user1, &user2, &mut sse1, &mut sse2)
                    .await?,
            );
            results.push(
                scenarios::test_message_broadcast(
                    &cli.channel,
                    &user1,
                    &api_client,
                    &mut sse1,
                    &mut sse2,
                )
                .await?,
            );
            results.push(scenarios::test_channel_lifecycle(&api_client, &mut sse1).await?);
            results
                .push(scenarios::test_presence_roster(&cli.channel, &api_client, &mut sse1).await?);
        }
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
