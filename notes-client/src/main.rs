//! `notes` — terminal front end for the notes service.
//!
//! Every run restores the persisted session first, then performs one command.
//! Configuration comes from the environment (and `.env`):
//!   NOTES_API_URL, NOTES_STATE_DIR, NOTES_HTTP_TIMEOUT_SECS

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use notes_client::flows::{Confirm, DeleteOutcome, FlowError, NoteEditor, SignUpForm};
use notes_client::query::FetchStatus;
use notes_client::session::RouteAccess;
use notes_client::{AppState, Config, view};

#[derive(Parser)]
#[command(name = "notes", version, about = "Personal notes from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Status,
    /// List all notes
    List,
    /// Print one note
    Show { id: String },
    /// Create a note
    Create {
        #[arg(long)]
        title: String,
        /// Note body (HTML markup is kept as-is)
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Change a note's title and/or content
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note after confirmation
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Confirmation read from the terminal.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::debug!(
        "Using API {} (state in {})",
        config.api_base_url,
        config.state_dir.display()
    );

    let app = match AppState::from_config(&config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };
    app.bootstrap();

    match run(&app, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            if e.is_unauthorized() {
                // Expired or revoked tokens are left in place; signing in again replaces them
                eprintln!("Your session may have expired. Run `notes login` to sign in again.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(app: &AppState, command: Command) -> Result<(), FlowError> {
    match command {
        Command::Login { email, password } => {
            let user = app.auth.login(&email, &password).await?;
            println!("Signed in as {}", user.email);
        }
        Command::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = SignUpForm {
                user_name: name,
                user_email: email,
                password,
                confirm_password,
            };
            let user = app.auth.register(&form).await?;
            println!("Account created for {}. Run `notes login` to sign in.", user.email);
        }
        Command::Logout => {
            app.auth.logout();
            println!("Signed out");
        }
        Command::Status => match app.session.route_access() {
            RouteAccess::Granted => {
                let state = app.session.snapshot();
                let who = state.user().map(|u| u.email.as_str()).unwrap_or("unknown user");
                println!("Signed in as {}", who);
            }
            RouteAccess::RedirectToSignIn | RouteAccess::Pending => println!("Not signed in"),
        },
        Command::List => {
            require_session(app)?;
            let notes = app.notes_query.fetch_notes().await?.unwrap_or_default();
            if notes.is_empty() {
                println!("No notes yet. Create one with `notes create --title ...`");
            }
            for note in notes.iter() {
                println!("{}", view::note_line(note));
            }
        }
        Command::Show { id } => {
            require_session(app)?;
            let note = app.api.get_note(&id).await?;
            println!("{}", view::note_detail(&note));
        }
        Command::Create { title, content } => {
            let mut editor = NoteEditor::create();
            editor.title = title;
            editor.content = content;
            let note = app.notes.save(&mut editor).await?;
            println!("Created {}", note.id);
            report_refresh(app);
        }
        Command::Edit { id, title, content } => {
            require_session(app)?;
            let current = app.api.get_note(&id).await?;
            let mut editor = NoteEditor::edit(&current);
            if let Some(title) = title {
                editor.title = title;
            }
            if let Some(content) = content {
                editor.content = content;
            }
            let note = app.notes.save(&mut editor).await?;
            println!("Updated {}", note.id);
            report_refresh(app);
        }
        Command::Delete { id, yes } => {
            let confirm: &dyn Confirm = if yes { &AlwaysConfirm } else { &StdinConfirm };
            match app.notes.delete_note(&id, confirm).await? {
                DeleteOutcome::Deleted => {
                    println!("Deleted {}", id);
                    report_refresh(app);
                }
                DeleteOutcome::Cancelled => println!("Kept {}", id),
            }
        }
    }
    Ok(())
}

fn require_session(app: &AppState) -> Result<(), FlowError> {
    if app.session.is_ready() {
        Ok(())
    } else {
        Err(FlowError::NotAuthenticated)
    }
}

/// After a mutation the list has been re-fetched; show its size or why it failed.
fn report_refresh(app: &AppState) {
    let snapshot = app.notes_query.snapshot();
    match (snapshot.status, snapshot.notes) {
        (FetchStatus::Error, _) => {
            if let Some(e) = snapshot.error {
                eprintln!("Could not refresh the note list: {}", e.user_message());
            }
        }
        (_, Some(notes)) => println!("{} note(s) in total", notes.len()),
        _ => {}
    }
}
