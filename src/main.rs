mod ai;
mod contacts;
mod db;
mod models;
mod pipeline;
mod profile;
mod score;
mod serp;
mod sources;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ai::ApiJudge;
use contacts::ContactFinder;
use db::{Database, FallbackLog};
use pipeline::{Gate, Pipeline};
use profile::Profile;
use serp::SerpClient;
use sources::{GoogleJobsAdapter, SiteSearchAdapter, SourceAdapter};

#[derive(Parser)]
#[command(name = "prospect")]
#[command(about = "Job discovery pipeline - search, score, and track opportunities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Run one discovery pass: search, dedup, score, persist, report
    Run {
        /// Max postings to score per run (judgment and contact lookups
        /// are the expensive steps)
        #[arg(short, long, default_value = "15")]
        limit: usize,

        /// Judge model (sonnet, opus, haiku, gpt-4o, gpt-5.2)
        #[arg(short, long, default_value = "sonnet")]
        model: String,

        /// Path to a JSON profile replacing the built-in one
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Score and report without persisting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored opportunities
    List {
        /// Filter by status (new, reviewing, applied, rejected, closed)
        #[arg(short, long)]
        status: Option<String>,

        /// Only show opportunities at or above this score
        #[arg(long)]
        min_score: Option<i64>,

        /// Number of rows to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Show one stored opportunity in full
    Show {
        /// Opportunity ID
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prospect=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let db = Database::open()?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Run { limit, model, profile, dry_run } => {
            let profile = match profile {
                Some(path) => Profile::from_file(&path)?,
                None => Profile::default(),
            };

            // Missing credentials are fatal before the run starts; an
            // unreachable store is not - the gate degrades instead.
            let client = SerpClient::from_env()?;
            let judge = ApiJudge::from_model_name(&model)?;

            let store = match Database::open() {
                Ok(db) => {
                    db.ensure_initialized()?;
                    Some(db)
                }
                Err(e) => {
                    warn!(error = %e, "could not open durable store");
                    None
                }
            };
            let gate = Gate::new(store, FallbackLog::new(FallbackLog::default_path()));

            let adapters: Vec<Box<dyn SourceAdapter>> = vec![
                Box::new(GoogleJobsAdapter::new(client.clone())),
                Box::new(SiteSearchAdapter::lever(client.clone())),
                Box::new(SiteSearchAdapter::greenhouse(client.clone())),
            ];
            let contacts = ContactFinder::new(client);

            let mut pipeline = Pipeline::new(
                adapters,
                Box::new(judge),
                Box::new(contacts),
                gate,
                profile,
                limit,
                dry_run,
            );

            let report = pipeline.run();
            println!("{}", report.report_text());
        }

        Commands::List { status, min_score, limit } => {
            let db = Database::open()?;
            db.ensure_initialized()?;
            let opportunities = db.list_recent(limit, status.as_deref(), min_score)?;

            if opportunities.is_empty() {
                println!("No opportunities found.");
            } else {
                println!(
                    "{:<6} {:>6} {:<10} {:<30} {:<20} {:<18}",
                    "ID", "SCORE", "STATUS", "TITLE", "COMPANY", "LOCATION"
                );
                println!("{}", "-".repeat(94));
                for opp in opportunities {
                    let score = opp
                        .match_score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<6} {:>6} {:<10} {:<30} {:<20} {:<18}",
                        opp.id,
                        score,
                        opp.status,
                        truncate(&opp.title, 28),
                        truncate(&opp.company_name, 18),
                        truncate(&opp.location, 16)
                    );
                }
            }
        }

        Commands::Show { id } => {
            let db = Database::open()?;
            db.ensure_initialized()?;
            match db.get(id)? {
                Some(opp) => {
                    println!("Opportunity #{}", opp.id);
                    println!("Title: {}", opp.title);
                    println!("Company: {}", opp.company_name);
                    println!("Location: {}", opp.location);
                    if let Some(url) = &opp.url {
                        println!("URL: {}", url);
                    }
                    if let Some(source) = &opp.source {
                        println!("Source: {}", source);
                    }
                    if let Some(score) = opp.match_score {
                        println!("Score: {}", score);
                    }
                    println!("Status: {}", opp.status);
                    println!("Added: {}", opp.created_at);
                    if let Some(analysis) = &opp.ai_analysis {
                        println!("\n--- Analysis ---\n{}", textwrap::fill(analysis, 80));
                    }
                    if !opp.contacts.is_empty() {
                        println!("\nContacts ({}):", opp.contacts.len());
                        for contact in &opp.contacts {
                            println!(
                                "  - {} | {}",
                                contact.name,
                                contact.profile_url.as_deref().unwrap_or("(no profile link)")
                            );
                            if let Some(snippet) = &contact.snippet {
                                println!("    {}", snippet);
                            }
                        }
                    }
                }
                None => {
                    println!("Opportunity #{} not found.", id);
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
