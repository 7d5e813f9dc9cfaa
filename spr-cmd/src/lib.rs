//! Command implementations for SPR CLI.
//!
//! Every subcommand reads from the results service, or from a JSON fixture
//! with `--fixture`, and renders one comparison screen as text, JSON or CSV.

use clap::{Subcommand, ValueEnum};
use spr_data::ComparisonScreen;

pub mod backend;
pub mod dashboard;
pub mod export;
pub mod filters;
pub mod report;

use backend::SourceArgs;
use filters::{ComparisonArgs, FilterArgs};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ScreenArg {
    /// Director screen: own school plus one other
    Director,
    /// Inspector screen: up to three schools
    #[default]
    Inspector,
}

impl From<ScreenArg> for ComparisonScreen {
    fn from(arg: ScreenArg) -> Self {
        match arg {
            ScreenArg::Director => ComparisonScreen::DirectorCompare,
            ScreenArg::Inspector => ComparisonScreen::InspectorCompare,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Rank schools for one year and filter
    Rankings {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Show only the first N rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare selected schools side by side and over time
    Compare {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        comparison: ComparisonArgs,

        /// School id to compare (repeat for each school; the first is the reference)
        #[arg(short, long = "school", required = true)]
        schools: Vec<u32>,

        /// Comparison screen, which bounds the number of schools
        #[arg(long, value_enum, default_value = "inspector")]
        screen: ScreenArg,

        /// Also compare boys and girls
        #[arg(long)]
        by_gender: bool,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summary statistics for one year and filter
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export rankings and summary to CSV
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Output path for the CSV file
        #[arg(short, long)]
        output: String,
    },

    /// Turn a free-text request into filters and show the rankings
    Suggest {
        #[command(flatten)]
        source: SourceArgs,

        /// Request, e.g. "filles de Kolwezi en 2024"
        prompt: String,
    },

    /// Search schools by name or code
    Schools {
        #[command(flatten)]
        source: SourceArgs,

        /// Text to search for
        search: String,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Rankings {
            source,
            filter,
            limit,
            json,
        } => dashboard::rankings(&source, &filter, limit, json).await,
        Command::Compare {
            source,
            filter,
            comparison,
            schools,
            screen,
            by_gender,
            json,
        } => {
            let request = dashboard::CompareRequest {
                schools,
                screen: screen.into(),
                by_gender,
                json,
            };
            dashboard::compare(&source, &filter, &comparison, &request).await
        }
        Command::Summary {
            source,
            filter,
            json,
        } => dashboard::summary(&source, &filter, json).await,
        Command::Export {
            source,
            filter,
            output,
        } => dashboard::export(&source, &filter, &output).await,
        Command::Suggest { source, prompt } => dashboard::suggest(&source, &prompt).await,
        Command::Schools { source, search } => dashboard::schools(&source, &search).await,
    }
}
