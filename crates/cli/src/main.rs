use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cardwise_cards::CardRepository;
use cardwise_core::{compute_reward, ExtractedEntities, SpendCategory};
use cardwise_engine::{QueryInput, QueryOrchestrator};
use cardwise_observability::{init_tracing, AppMetrics};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(name = "cardwise")]
#[command(about = "CardWise Concierge CLI")]
struct Cli {
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat mode; entities carry over from the previous turn
    Chat,
    /// One-shot query, prints the structured reply as JSON
    Query { text: String },
    Cards {
        #[command(subcommand)]
        command: CardsCommand,
    },
    /// Direct reward computation, bypassing the text pipeline
    Calc {
        #[arg(long)]
        card: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: String,
    },
}

#[derive(Debug, Subcommand)]
enum CardsCommand {
    List,
}

fn main() -> Result<()> {
    init_tracing("cardwise_cli");
    let cli = Cli::parse();

    let orchestrator = build_orchestrator(&cli.data_dir)?;

    match cli.command {
        Command::Chat => run_chat(orchestrator)?,
        Command::Query { text } => {
            let reply = orchestrator.handle_query(QueryInput {
                text,
                prior_entities: None,
            });
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Cards { command } => match command {
            CardsCommand::List => {
                for card in orchestrator.repository().cards() {
                    println!("{}  {} ({})", card.id, card.display_name, card.reward_currency);
                }
            }
        },
        Command::Calc {
            card,
            category,
            amount,
        } => {
            let amount = amount
                .parse::<Decimal>()
                .context("invalid --amount value")?;
            let category = category
                .as_deref()
                .map(|value| {
                    SpendCategory::parse(value)
                        .with_context(|| format!("invalid --category value '{value}'"))
                })
                .transpose()?;
            let card = orchestrator
                .repository()
                .get(&card)
                .with_context(|| format!("unknown card id '{card}'"))?;

            let result = compute_reward(card, category, amount)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn run_chat(orchestrator: QueryOrchestrator) -> Result<()> {
    let mut prior: Option<ExtractedEntities> = None;

    println!("CardWise Concierge chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }
        if message.is_empty() {
            continue;
        }

        let reply = orchestrator.handle_query(QueryInput {
            text: message.to_string(),
            prior_entities: prior.take(),
        });

        println!("\nintent: {}", serde_json::to_string(&reply.intent)?);
        println!("entities: {}", serde_json::to_string(&reply.entities)?);
        if let Some(computation) = &reply.computation {
            println!("{}", serde_json::to_string_pretty(computation)?);
        }
        if let Some(clarification) = &reply.clarification {
            println!("{}", clarification.prompt);
        }
        println!();

        prior = Some(reply.entities.clone());
    }

    Ok(())
}

fn build_orchestrator(data_dir: &Path) -> Result<QueryOrchestrator> {
    let repository = Arc::new(
        CardRepository::from_data_dir(data_dir)
            .with_context(|| format!("failed loading card data from {}", data_dir.display()))?,
    );

    Ok(QueryOrchestrator::new(repository, AppMetrics::shared()))
}
