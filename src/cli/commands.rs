//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tagmerge")]
#[command(about = "Compare and merge annotated text documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new tagmerge project
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List a document's tags
    Tags {
        /// Document file (JSON record)
        file: PathBuf,
    },

    /// Print a document's plain text, tags stripped
    Show {
        /// Document file (JSON record)
        file: PathBuf,
    },

    /// Align annotated documents and write a comparison record
    Compare {
        /// Annotation files to compare
        #[arg(num_args = 2.., required = true)]
        files: Vec<PathBuf>,

        /// Where to write the comparison record
        #[arg(short, long, default_value = "comparison.json")]
        output: PathBuf,
    },

    /// Adopt one annotator's sentence into the merged document
    Adopt {
        /// Comparison record file
        file: PathBuf,

        /// Annotator column to adopt from (1 = first annotator)
        #[arg(short, long)]
        annotator: usize,

        /// Differing unit to adopt (default: the record's current unit)
        #[arg(short, long)]
        unit: Option<usize>,
    },
}
