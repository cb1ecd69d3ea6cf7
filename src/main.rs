use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use xwordgen::word_corpus::load_dictionary;
use xwordgen::{daily_seed, validate_answers, Grid, PuzzleBuilder, PuzzleConfig, ValidationRequest};

/// Build daily crossword puzzles and check answers against them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a puzzle and write it as JSON.
    Generate(GenerateArgs),

    /// Read a validation request (JSON) and print the result.
    Check {
        #[arg(short, long)]
        request: PathBuf,
    },
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Word list: a JSON array of records, or `WORD;clue[;common[;plural[;technical]]]` lines.
    #[arg(short, long)]
    dictionary: PathBuf,

    /// Seed string. Defaults to one derived from `--secret` and `--date`.
    #[arg(long, conflicts_with = "secret")]
    seed: Option<String>,

    #[arg(long, default_value = "")]
    secret: String,

    /// Puzzle date as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// JSON file of `PuzzleConfig` fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the 5x5 preset instead of the standard one.
    #[arg(long, conflicts_with = "config")]
    mini: bool,

    #[arg(long)]
    size: Option<usize>,

    #[arg(long)]
    max_attempts: Option<usize>,

    /// Fill this block layout (`#` blocks, `.` open, letters pre-filled) instead of generating one.
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Where to write the puzzle JSON. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn generate(args: GenerateArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match (&args.config, args.mini) {
        (Some(path), _) => PuzzleConfig::from_json_file(path)?,
        (None, true) => PuzzleConfig::mini(),
        (None, false) => PuzzleConfig::standard(),
    };
    if let Some(size) = args.size {
        config.size = size;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
    debug!("Config: {:?}", config);

    let seed = match args.seed {
        Some(seed) => seed,
        None => {
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            info!("Deriving seed for {}", date);
            daily_seed(&args.secret, date)
        }
    };

    let corpus = load_dictionary(&args.dictionary, &config)?;
    let builder = PuzzleBuilder::new(&corpus, config);

    let puzzle = match &args.template {
        Some(path) => {
            let template = Grid::from_template(&fs::read_to_string(path)?)?;
            builder.build_from_template(&template, &seed)?
        }
        None => builder.build(&seed)?,
    };
    eprintln!("{}", puzzle.grid);

    let json = serde_json::to_string_pretty(&puzzle)?;
    match args.output {
        Some(path) => {
            fs::write(&path, json)?;
            info!("Wrote puzzle to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn check(request: PathBuf) -> Result<(), Box<dyn Error>> {
    let request: ValidationRequest = serde_json::from_str(&fs::read_to_string(request)?)?;
    let result = validate_answers(&request);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate(args) => generate(args),
        Command::Check { request } => check(request),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
