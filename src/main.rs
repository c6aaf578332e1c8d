use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::error;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with search parameters; explicit flags override it
    #[arg(global = true, short = 'c', long = "config")]
    config_file: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Search(cmd::search::SearchArgs),
    Inspect(cmd::inspect::InspectArgs),
    Functions,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Raw matches tell user input apart from clap defaults
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let result = match cli.command {
        Commands::Search(args) => match matches.subcommand_matches("search") {
            Some(sub) => cmd::search::run(args, sub, cli.config_file.as_deref()),
            None => Ok(()),
        },
        Commands::Inspect(args) => cmd::inspect::run(args),
        Commands::Functions => {
            cmd::functions::run();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("❌ {}", e);
        process::exit(1);
    }
}
