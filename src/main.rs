mod cli;
mod config;
mod core;
mod error;
mod logging;
mod tui;

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::core::{
    ANALYSIS_REQUEST, Controller, SessionEvent, TranscriptProvider, extract_thumbnail_prompt,
    extract_video_id,
};
use crate::error::Result;
use crate::tui::App;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::try_from(cli.settings)?;

    match cli.command {
        Some(Commands::Get { url, force }) => {
            logging::init_stderr(cli.verbose)?;
            run_cli_get(&settings, &url, force).await
        }
        Some(Commands::Analyze { url, file, no_save }) => {
            logging::init_stderr(cli.verbose)?;
            run_cli_analyze(&settings, url, file, !no_save).await
        }
        Some(Commands::Ask {
            url,
            messages,
            json,
        }) => {
            logging::init_stderr(cli.verbose)?;
            run_cli_ask(&settings, &url, messages, json).await
        }
        Some(Commands::List) => {
            logging::init_stderr(cli.verbose)?;
            run_cli_list(&settings)
        }
        Some(Commands::Chat) | None => {
            logging::init_file(&settings.data_dir, cli.verbose)?;
            run_tui(settings).await
        }
    }
}

async fn run_cli_get(settings: &Settings, url: &str, force: bool) -> Result<()> {
    let video_id = extract_video_id(url)?;
    let storage = settings.storage();
    if !force && storage.transcript_exists(&video_id) {
        println!(
            "Transcript already saved at: {} (use --force to download again)",
            storage.transcript_path(&video_id)?.display()
        );
        return Ok(());
    }
    println!("Fetching transcript for video: {video_id}");

    let transcript = settings.transcripts()?.fetch(&video_id).await?;
    let path = storage.save_transcript(&transcript).await?;

    println!(
        "{} segments ({}) saved to: {}",
        transcript.segments().len(),
        transcript.language,
        path.display()
    );
    Ok(())
}

async fn run_cli_analyze(
    settings: &Settings,
    url: Option<String>,
    file: Option<PathBuf>,
    save: bool,
) -> Result<()> {
    let mut controller = Controller::new(
        settings.transcripts()?,
        settings.connect_model().await?,
        settings.prompts(),
    );

    let event = match (file, url) {
        (Some(path), _) => {
            let content = tokio::fs::read_to_string(&path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.txt".to_string());
            println!("Document received. Currently reviewing...");
            SessionEvent::LoadDocument { name, content }
        }
        (None, Some(url)) => {
            println!("Video received. Currently reviewing...");
            SessionEvent::SubmitVideo(url)
        }
        (None, None) => return Err(error::Error::custom("Provide a video URL or --file")),
    };
    controller.dispatch(event).await?;

    let reply = controller
        .dispatch(SessionEvent::SubmitMessage(ANALYSIS_REQUEST.to_string()))
        .await?
        .unwrap_or_default();
    println!();
    println!("{reply}");

    if save {
        let session = controller.session();
        let storage = settings.storage();
        let video_id = session.video_id().unwrap_or("unknown");

        if let Some(transcript) = session.transcript() {
            storage.save_transcript(transcript).await?;
        }
        let path = storage.save_conversation(video_id, session.history()).await?;
        println!();
        println!("Conversation saved to: {}", path.display());

        if let Some(prompt) = extract_thumbnail_prompt(&reply) {
            let path = storage.save_thumbnail_prompt(video_id, &prompt).await?;
            println!("Thumbnail brief saved to: {}", path.display());
        }
    }

    Ok(())
}

async fn run_cli_ask(
    settings: &Settings,
    url: &str,
    messages: Vec<String>,
    json: bool,
) -> Result<()> {
    let mut controller = Controller::new(
        settings.transcripts()?,
        settings.connect_model().await?,
        settings.prompts(),
    );

    controller
        .dispatch(SessionEvent::SubmitVideo(url.to_string()))
        .await?;

    for message in messages {
        if !json {
            println!("> {message}");
        }
        let reply = controller
            .dispatch(SessionEvent::SubmitMessage(message))
            .await?
            .unwrap_or_default();
        if !json {
            println!("{reply}");
            println!();
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(controller.session().history())?
        );
    }

    Ok(())
}

fn run_cli_list(settings: &Settings) -> Result<()> {
    let files = settings.storage().list_files()?;

    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    println!("Found {} files:", files.len());
    println!();

    for file in files {
        println!(
            "{:<14} {:<50} {}",
            file.file_type.label(),
            file.name,
            file.size_label()
        );
    }

    Ok(())
}

async fn run_tui(settings: Settings) -> Result<()> {
    // Connect before taking over the terminal so setup errors print normally
    let mut app = App::new(&settings).await?;

    let mut terminal = tui::init()?;
    let outcome = tui::run(&mut terminal, &mut app);
    tui::restore()?;
    outcome
}
