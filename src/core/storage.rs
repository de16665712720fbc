use crate::core::conversation::{ConversationTurn, Role};
use crate::core::format;
use crate::core::transcript::{self, Transcript};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs as std_fs;
use std::path::{Path, PathBuf};

use tokio::fs;

const TRANSCRIPTS_DIR: &str = "transcripts";
const CONVERSATIONS_DIR: &str = "conversations";
const THUMBNAILS_DIR: &str = "thumbnails";
const TRANSCRIPT_PREFIX: &str = "transcript_";
const TRANSCRIPT_SUFFIX: &str = ".txt";
const CONVERSATION_PREFIX: &str = "conversation_";
const CONVERSATION_SUFFIX: &str = ".md";
const THUMBNAIL_PREFIX: &str = "thumbnail_";
const THUMBNAIL_SUFFIX: &str = ".txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified: std::time::SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FileType {
    Transcript,
    Conversation,
    Thumbnail,
}

impl FileType {
    fn layout(self) -> (&'static str, &'static str, &'static str) {
        match self {
            FileType::Transcript => (TRANSCRIPTS_DIR, TRANSCRIPT_PREFIX, TRANSCRIPT_SUFFIX),
            FileType::Conversation => (CONVERSATIONS_DIR, CONVERSATION_PREFIX, CONVERSATION_SUFFIX),
            FileType::Thumbnail => (THUMBNAILS_DIR, THUMBNAIL_PREFIX, THUMBNAIL_SUFFIX),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileType::Transcript => "Transcript",
            FileType::Conversation => "Conversation",
            FileType::Thumbnail => "Thumbnail",
        }
    }
}

const ALL_TYPES: [FileType; 3] = [
    FileType::Transcript,
    FileType::Conversation,
    FileType::Thumbnail,
];

/// Files offered for download: transcripts, conversation exports and
/// thumbnail briefs, each in its own directory under `root`.
#[derive(Debug, Clone)]
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, file_type: FileType) -> PathBuf {
        self.root.join(file_type.layout().0)
    }

    fn ensure_directories(&self) -> Result<()> {
        for file_type in ALL_TYPES {
            ensure_directory(&self.dir(file_type))?;
        }
        Ok(())
    }

    fn managed_path(&self, file_type: FileType, stem: &str) -> PathBuf {
        let (_, prefix, suffix) = file_type.layout();
        self.dir(file_type).join(format!("{prefix}{stem}{suffix}"))
    }

    pub fn transcript_path(&self, video_id: &str) -> Result<PathBuf> {
        let sanitized = transcript::sanitize_video_id(video_id)?;
        Ok(self.managed_path(FileType::Transcript, &sanitized))
    }

    pub fn transcript_exists(&self, video_id: &str) -> bool {
        self.transcript_path(video_id)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    pub async fn save_transcript(&self, transcript: &Transcript) -> Result<PathBuf> {
        self.ensure_directories()?;
        let path = self.transcript_path(&transcript.video_id)?;

        let content = format::timestamped(transcript).join("\n");
        fs::write(&path, &content).await?;
        tracing::info!(path = %path.display(), "transcript saved");

        Ok(path)
    }

    pub async fn save_conversation(
        &self,
        video_id: &str,
        turns: &[ConversationTurn],
    ) -> Result<PathBuf> {
        if turns.is_empty() {
            return Err(Error::custom("Nothing to export: the conversation is empty"));
        }
        self.ensure_directories()?;

        let sanitized = transcript::sanitize_video_id(video_id)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self.managed_path(FileType::Conversation, &format!("{sanitized}_{stamp}"));

        fs::write(&path, render_conversation(&sanitized, turns)).await?;
        tracing::info!(path = %path.display(), turns = turns.len(), "conversation exported");

        Ok(path)
    }

    pub async fn save_thumbnail_prompt(&self, video_id: &str, prompt: &str) -> Result<PathBuf> {
        self.ensure_directories()?;
        let sanitized = transcript::sanitize_video_id(video_id)?;
        let path = self.managed_path(FileType::Thumbnail, &sanitized);

        fs::write(&path, prompt).await?;
        tracing::info!(path = %path.display(), "thumbnail prompt saved");

        Ok(path)
    }

    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        self.ensure_directories()?;
        let mut files = Vec::new();

        for file_type in ALL_TYPES {
            let (_, prefix, suffix) = file_type.layout();
            let Ok(entries) = std_fs::read_dir(self.dir(file_type)) else {
                continue;
            };

            for entry in entries {
                let entry = entry?;
                let path = entry.path();

                if let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && name.starts_with(prefix)
                    && name.ends_with(suffix)
                {
                    let metadata = entry.metadata()?;
                    files.push(FileEntry {
                        path: path.clone(),
                        name: name.to_string(),
                        file_type,
                        size: metadata.len(),
                        modified: metadata.modified()?,
                    });
                }
            }
        }

        // Newest first
        files.sort_by(|a, b| b.modified.cmp(&a.modified));

        Ok(files)
    }

    pub fn delete_file(&self, path: &Path) -> Result<()> {
        self.ensure_directories()?;
        self.ensure_managed_path(path)?;
        std_fs::remove_file(path)?;
        tracing::info!(path = %path.display(), "file deleted");
        Ok(())
    }

    fn ensure_managed_path(&self, path: &Path) -> Result<()> {
        let canonical = path
            .canonicalize()
            .map_err(|_| Error::custom("Target file does not exist or cannot be resolved"))?;

        let allowed = ALL_TYPES.iter().any(|&file_type| {
            self.dir(file_type)
                .canonicalize()
                .map(|base| canonical.starts_with(base))
                .unwrap_or(false)
        });

        if !allowed {
            return Err(Error::custom(
                "Refusing to operate on files outside managed storage directories",
            ));
        }

        Ok(())
    }
}

impl FileEntry {
    pub fn size_label(&self) -> String {
        let size_kb = self.size / 1024;
        if size_kb < 1024 {
            format!("{size_kb}KB")
        } else {
            format!("{:.1}MB", size_kb as f64 / 1024.0)
        }
    }
}

/// Markdown export of a conversation.
pub fn render_conversation(video_id: &str, turns: &[ConversationTurn]) -> String {
    let mut out = format!("# Conversation about {video_id}\n");
    for turn in turns {
        let speaker = match turn.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("\n## {speaker}\n\n{}\n", turn.content.trim()));
    }
    out
}

fn ensure_directory(path: &Path) -> Result<()> {
    std_fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std_fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o777 != 0o700 {
            permissions.set_mode(0o700);
            std_fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}
