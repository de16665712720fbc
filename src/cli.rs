use crate::config::SettingsArgs;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ytadvisor")]
#[command(about = "YouTube content optimization assistant: chat with a model about a video's transcript")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the chat interface (default)
    Chat,

    /// Download a video's transcript as a text file
    Get {
        /// YouTube video URL or video ID
        url: String,

        /// Download again even if the transcript is already saved
        #[arg(short, long)]
        force: bool,
    },

    /// Run the full optimization analysis on a video or a text document
    Analyze {
        /// YouTube video URL or video ID
        #[arg(required_unless_present = "file")]
        url: Option<String>,

        /// Analyze a local text file instead of a video transcript
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Do not write the conversation and thumbnail brief to disk
        #[arg(long)]
        no_save: bool,
    },

    /// Ask one or more questions about a video, in order, as one conversation
    Ask {
        /// YouTube video URL or video ID
        url: String,

        /// Messages to send
        #[arg(required = true)]
        messages: Vec<String>,

        /// Print the whole conversation as JSON instead of plain replies
        #[arg(long)]
        json: bool,
    },

    /// List downloaded transcripts, exported conversations and thumbnail briefs
    List,
}
