use anyhow::Context as _;
use clap::{Parser, Subcommand};
use grammarkit::{first_sets::FirstSets, follow_sets::FollowSets, grammar::Grammar, lr0};
use std::{
    io::{self, Read as _},
    path::PathBuf,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the FIRST and FOLLOW sets of every nonterminal.
    FirstFollow {
        /// The path of grammar definition file. Read from stdin if omitted.
        input: Option<PathBuf>,
    },

    /// Print the canonical collection of LR(0) item sets.
    Lr0 {
        /// The path of grammar definition file. Read from stdin if omitted.
        input: Option<PathBuf>,

        /// Print the augmented grammar before the item sets.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        augmented: bool,

        /// Give up once the collection grows beyond this many states.
        #[arg(long)]
        max_states: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    tracing::trace!("CLI args = {:?}", args);

    match args.command {
        Command::FirstFollow { input } => {
            let grammar = read_grammar(input)?;
            println!("{}", grammar);

            let start = Instant::now();
            let first_sets = FirstSets::new(&grammar)?;
            let follow_sets = FollowSets::new(&grammar, &first_sets)?;
            tracing::info!("FIRST/FOLLOW: {:?} elapsed", start.elapsed());

            print!("{}", first_sets.display(&grammar));
            println!();
            print!("{}", follow_sets.display(&grammar));
        }

        Command::Lr0 {
            input,
            augmented,
            max_states,
        } => {
            let grammar = read_grammar(input)?;

            let mut config = lr0::Config::new();
            if let Some(max_states) = max_states {
                config = config.max_states(max_states);
            }

            let start = Instant::now();
            let automaton = config
                .build(&grammar)
                .context("failed to build the LR(0) automaton")?;
            tracing::info!(
                "LR(0): {} states, {:?} elapsed",
                automaton.len(),
                start.elapsed()
            );

            if augmented {
                println!("{}", automaton.grammar());
            }
            print!("{}", automaton.display());
        }
    }

    Ok(())
}

fn read_grammar(input: Option<PathBuf>) -> anyhow::Result<Grammar> {
    let start = Instant::now();
    let grammar = match input {
        Some(path) => Grammar::from_file(&path)
            .with_context(|| format!("failed to read the grammar from {}", path.display()))?,
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read the grammar from stdin")?;
            Grammar::from_str(&source).context("failed to read the grammar from stdin")?
        }
    };
    tracing::info!("reading the grammar: {:?} elapsed", start.elapsed());
    Ok(grammar)
}
