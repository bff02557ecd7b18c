//! Command handlers for the tutorpad CLI.

use std::{
    fs,
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::info;
use shell_words::split;
use tempfile::Builder;

use crate::{
    Assistant, Commands, Config, Note, PadError, Result, Role, Session, Settings, SpeechClient,
    VoiceName,
};

/// CLI application handler - processes CLI commands and drives the session.
pub struct App {
    /// The live workspace
    session: Session,

    /// Application configuration
    config: Config,

    /// Persisted user preferences
    settings: Settings,
}

impl App {
    pub fn new(session: Session, config: Config, settings: Settings) -> Self {
        Self {
            session,
            config,
            settings,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::New { content, file } => self.create_note(content, file)?,

            Commands::List { limit, json, brief } => self.list_notes(limit, json, brief)?,

            Commands::Show { id, json } => self.show_note(&id, json)?,

            Commands::Edit {
                id,
                content,
                file,
                editor,
            } => self.edit_note(&id, content, file, editor)?,

            Commands::Rename { id, title } => {
                self.session.rename_note(&id, &title)?;
                println!("Note {} renamed to '{}'", id, title);
            }

            Commands::Delete { id, force } => self.delete_note(&id, force)?,

            Commands::Search { query, limit, json } => self.search_notes(&query, limit, json)?,

            Commands::Chat { id, message, image } => self.chat(&id, &message, image).await?,

            Commands::Speak {
                id,
                text,
                output,
                voice,
            } => self.speak(id, text, &output, voice).await?,

            Commands::Config { show, set, reset } => self.configure(show, set, reset)?,
        }

        Ok(())
    }

    fn create_note(&mut self, content: Option<String>, file: Option<PathBuf>) -> Result<()> {
        let seed = match (content, file) {
            (Some(c), _) => Some(c),
            (_, Some(file_path)) => {
                if !file_path.exists() {
                    return Err(PadError::FileNotFound {
                        file_path: file_path.display().to_string(),
                    });
                }
                Some(fs::read_to_string(file_path)?)
            }
            (None, None) => None,
        };

        let id = self.session.create_note();
        if let Some(seed) = seed {
            // Seeding goes through the repository so the title derives
            self.session.commit_now(&id, &seed)?;
        }

        println!("Note created with ID: {}", id);
        Ok(())
    }

    fn list_notes(&self, limit: usize, json: bool, brief: bool) -> Result<()> {
        let notes: Vec<&Note> = self.session.notes().iter().take(limit).collect();
        self.display_notes(&notes, json, brief)
    }

    fn search_notes(&self, query: &str, limit: usize, json: bool) -> Result<()> {
        let notes = self.session.search(query, limit);
        self.display_notes(&notes, json, false)
    }

    fn display_notes(&self, notes: &[&Note], json: bool, brief: bool) -> Result<()> {
        if notes.is_empty() {
            println!("No notes found.");
            return Ok(());
        }

        if json {
            if brief {
                let simplified: Vec<serde_json::Value> = notes
                    .iter()
                    .map(|note| {
                        serde_json::json!({
                            "id": note.id,
                            "title": note.title,
                            "updated_at": note.updated_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&simplified)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            }
            return Ok(());
        }

        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let updated_at = note.updated_at.format("%Y-%m-%d %H:%M");
            println!("ID: {} | Updated: {}", note.id, updated_at);
            println!("Title: {}", console::style(&note.title).bold());

            if !note.chat_history.is_empty() {
                println!(
                    "Chat: {}",
                    console::style(format!("{} messages", note.chat_history.len())).cyan()
                );
            }

            if !brief {
                let preview = content_preview(&note.content, 100);
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }

        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    fn show_note(&self, id: &str, json: bool) -> Result<()> {
        let note = self.session.note(id).ok_or_else(|| PadError::NoteNotFound {
            id: id.to_string(),
        })?;

        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
            return Ok(());
        }

        println!("{}", console::style(&note.title).bold());
        println!("ID: {} | Updated: {}", note.id, note.updated_at.format("%Y-%m-%d %H:%M"));
        println!("\n{}", note.content);

        if !note.chat_history.is_empty() {
            println!("\n{}", console::style("Conversation:").bold());
            for message in &note.chat_history {
                let speaker = match message.role {
                    Role::User => console::style("You").green(),
                    Role::Model => console::style("AI Teacher").cyan(),
                };
                println!("[{}] {}", speaker, message.text);
            }
        }

        Ok(())
    }

    fn edit_note(
        &mut self,
        id: &str,
        content: Option<String>,
        file: Option<PathBuf>,
        editor: bool,
    ) -> Result<()> {
        let current = self
            .session
            .note(id)
            .ok_or_else(|| PadError::NoteNotFound { id: id.to_string() })?
            .content
            .clone();

        let new_content = match (content, file, editor) {
            (Some(c), _, _) => c,
            (_, Some(file_path), _) => {
                if !file_path.exists() {
                    return Err(PadError::FileNotFound {
                        file_path: file_path.display().to_string(),
                    });
                }
                fs::read_to_string(file_path)?
            }
            (None, None, _) => self.open_editor_for_content(&current)?,
        };

        self.session.commit_now(id, &new_content)?;
        let title = &self.session.note(id).map(|n| n.title.clone()).unwrap_or_default();
        println!("Note {} saved (title: '{}')", id, title);
        Ok(())
    }

    fn open_editor_for_content(&self, current: &str) -> Result<String> {
        // Create a temporary file with .md extension seeded with the note
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();
        fs::write(&temp_path, current)?;

        let editor_cmd = self.config.get_editor_command();

        info!("Opening editor to edit note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        Ok(fs::read_to_string(&temp_path)?)
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let path_str = file_path.to_string_lossy();

        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| PadError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        if args.is_empty() {
            return Err(PadError::EditorError {
                message: "Empty editor command".to_string(),
            });
        }

        let mut command = Command::new(&args[0]);
        if args.len() > 1 {
            command.args(&args[1..]);
        }
        command.arg(path_str.as_ref());

        let status = command.status()?;
        if !status.success() {
            return Err(PadError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }

    fn delete_note(&mut self, id: &str, force: bool) -> Result<()> {
        let title = self
            .session
            .note(id)
            .ok_or_else(|| PadError::NoteNotFound { id: id.to_string() })?
            .title
            .clone();

        if !force {
            print!("Delete note '{}'? [y/N] ", title);
            stdout().flush()?;
            let mut answer = String::new();
            stdin().read_line(&mut answer)?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                println!("Aborted.");
                return Ok(());
            }
        }

        self.session.delete_note(id);
        println!("Note {} deleted", id);
        Ok(())
    }

    async fn chat(&mut self, id: &str, message: &str, image: Option<PathBuf>) -> Result<()> {
        let image_base64 = match image {
            Some(path) => {
                if !path.exists() {
                    return Err(PadError::FileNotFound {
                        file_path: path.display().to_string(),
                    });
                }
                Some(BASE64.encode(fs::read(path)?))
            }
            None => None,
        };

        let assistant = Assistant::new(self.config.api_key.clone());
        let reply = self
            .session
            .ask_assistant(&assistant, id, message, image_base64)
            .await?;

        println!("{}", console::style("AI Teacher:").cyan().bold());
        println!("{}", reply);
        Ok(())
    }

    async fn speak(
        &mut self,
        id: Option<String>,
        text: Option<String>,
        output: &Path,
        voice: Option<VoiceName>,
    ) -> Result<()> {
        let text = match (id, text) {
            (Some(id), _) => self
                .session
                .note(&id)
                .ok_or_else(|| PadError::NoteNotFound { id })?
                .content
                .clone(),
            (None, Some(text)) => text,
            (None, None) => {
                return Err(PadError::ApplicationError {
                    message: "Provide a note with --id or text with --text".to_string(),
                });
            }
        };

        let voice = voice.unwrap_or(self.settings.voice);
        let speech = SpeechClient::new(self.config.api_key.clone());

        match self.session.speak(&speech, &text, voice).await {
            Some(wav) => {
                fs::write(output, wav)?;
                println!("Audio written to {}", output.display());
            }
            None => println!("No audio available."),
        }

        Ok(())
    }

    fn configure(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        if reset {
            self.settings = Settings::default();
            self.settings.save(self.session.store());
            println!("Settings reset to defaults.");
        }

        if let Some(ref assignment) = set {
            self.settings.set(&assignment)?;
            self.settings.save(self.session.store());
            println!("Updated: {}", assignment);
        }

        if show || (set.is_none() && !reset) {
            println!("data_dir = {}", self.config.data_dir.display());
            println!("theme    = {:?}", self.settings.theme);
            println!("accent   = {:?}", self.settings.accent);
            println!("voice    = {:?}", self.settings.voice);
        }

        Ok(())
    }
}

/// First line or first `max_chars` characters of the content, whichever is
/// shorter.
fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content.lines().next().unwrap_or("");
    first_line.chars().take(max_chars).collect()
}
