//! A simple CLI for comparing, submitting and ranking phrases.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use phrase_ranker_common::client_api::{
    get_pair_from_server, get_rankings_from_server, submit_comparison_to_server,
    submit_phrase_to_server,
};
use phrase_ranker_common::{CLIENT_VERSION, PhraseData};
use reqwest::blocking::Client;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// The base API URL to connect to
    #[arg(
        long,
        default_value = "http://localhost:3000",
        env = "PHRASE_RANKER_API_BASE",
        global = true
    )]
    api_base: String,

    /// Suppress all output except results
    #[arg(short, long, env = "PHRASE_RANKER_QUIET", global = true)]
    quiet: bool,

    /// Show additional output
    #[arg(short, long, env = "PHRASE_RANKER_VERBOSE", global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Judge a random pair of phrases
    Compare {
        /// Pick the winner without prompting (1 or 2)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        pick: Option<u8>,

        /// Keep judging new pairs until stdin is closed or `q` is entered
        #[arg(short, long)]
        repeat: bool,
    },
    /// Submit a new phrase
    Submit {
        /// The phrase text
        text: String,
    },
    /// Show every phrase ranked by rating
    Rankings {
        /// Refresh the rankings periodically
        #[arg(short, long)]
        watch: bool,

        /// Seconds between refreshes in watch mode
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

/// What the user chose for a pair.
#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Winner(usize),
    Skip,
    Quit,
}

fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" => Some(Choice::Winner(0)),
        "2" => Some(Choice::Winner(1)),
        "s" | "skip" => Some(Choice::Skip),
        "q" | "quit" => Some(Choice::Quit),
        _ => None,
    }
}

/// Render phrases as a rank table with ratings rounded to whole points.
fn format_rankings(phrases: &[PhraseData]) -> String {
    if phrases.is_empty() {
        return "No phrases yet. Submit one to get started.\n".to_string();
    }
    let rank_width = phrases.len().to_string().len().max(4);
    let mut output = format!("{:>rank_width$}  {:>6}  Phrase\n", "Rank", "Rating");
    for (i, phrase) in phrases.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let rating = phrase.elo_rating.round() as i64;
        let _ = writeln!(
            output,
            "{:>rank_width$}  {:>6}  {}",
            i + 1,
            rating,
            phrase.text
        );
    }
    output
}

fn read_choice(input: &mut impl BufRead) -> Result<Choice> {
    loop {
        print!("Which is better? [1/2, s to skip, q to quit] ");
        io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Choice::Quit);
        }
        match parse_choice(&line) {
            Some(choice) => return Ok(choice),
            None => println!("Please enter 1, 2, s or q."),
        }
    }
}

fn run_compare(cli: &Cli, client: &Client, pick: Option<u8>, repeat: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let pair = get_pair_from_server(client, &cli.api_base)?;
        println!("1) {}", pair[0].text);
        println!("2) {}", pair[1].text);

        let choice = match pick {
            Some(n) => Choice::Winner(usize::from(n) - 1),
            None => read_choice(&mut input)?,
        };
        match choice {
            Choice::Quit => return Ok(()),
            Choice::Skip => log::debug!("Skipped pair #{} / #{}", pair[0].id, pair[1].id),
            Choice::Winner(index) => {
                let winner = &pair[index];
                let result =
                    submit_comparison_to_server(client, &cli.api_base, pair[0].id, pair[1].id, winner.id)?;
                if !cli.quiet {
                    println!("{}", result.message);
                }
                if cli.verbose {
                    println!(
                        "  #{}: {:.1}, #{}: {:.1}",
                        result.phrase1.id,
                        result.phrase1.elo_rating,
                        result.phrase2.id,
                        result.phrase2.elo_rating
                    );
                }
            }
        }

        if !repeat {
            return Ok(());
        }
        println!();
    }
}

fn run_rankings(cli: &Cli, client: &Client, watch: bool, interval: u64) -> Result<()> {
    if watch && interval == 0 {
        bail!("--interval must be at least 1 second");
    }
    loop {
        let phrases = get_rankings_from_server(client, &cli.api_base)?;
        print!("{}", format_rankings(&phrases));
        if !watch {
            return Ok(());
        }
        log::debug!("Refreshing in {interval} seconds");
        thread::sleep(Duration::from_secs(interval));
        println!();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if !cli.quiet {
        println!("Phrase Ranker Client v{CLIENT_VERSION}, using {}", cli.api_base);
    }
    if cli.verbose {
        println!("CLI Inputs: {cli:?}");
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Could not build HTTP client")?;

    match &cli.command {
        Command::Compare { pick, repeat } => run_compare(&cli, &client, *pick, *repeat),
        Command::Submit { text } => {
            let phrase = submit_phrase_to_server(&client, &cli.api_base, text)?;
            println!("Created phrase #{}: {} ({})", phrase.id, phrase.text, phrase.elo_rating);
            Ok(())
        }
        Command::Rankings { watch, interval } => run_rankings(&cli, &client, *watch, *interval),
    }
}
