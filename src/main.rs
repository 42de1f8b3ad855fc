mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use neurolinker::assistant::create_provider;
use neurolinker::config::NeuroConfig;
use neurolinker::language::Language;
use neurolinker::storage::types::PreferencesUpdate;

use cli::assist::SuggestOptions;
use cli::history::HistoryOptions;
use cli::Credentials;

#[derive(Parser)]
#[command(name = "neurolinker", version, about = "Conversational decision journal")]
struct Cli {
    /// Account email
    #[arg(long, global = true, env = "NEUROLINKER_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "NEUROLINKER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        /// Display name
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Check credentials
    Login,
    /// Change the account password
    Passwd {
        /// The new password
        #[arg(long)]
        new_password: String,
    },
    /// Record a decision through conversation
    Record {
        /// Language to start in (en or hi); switches automatically as you write
        #[arg(long, default_value = "en")]
        language: Language,
    },
    /// Browse and manage recorded decisions
    Decisions {
        #[command(subcommand)]
        action: DecisionsAction,
    },
    /// Show chat history
    History {
        /// Only this chat type (decision_recording, suggestion, reflection)
        #[arg(long = "type")]
        chat_type: Option<String>,
        /// Only messages linked to this decision
        #[arg(long)]
        decision: Option<String>,
        /// Only exchanges containing this text
        #[arg(long)]
        search: Option<String>,
        /// Oldest first instead of newest first
        #[arg(long)]
        oldest_first: bool,
        /// Include messages hidden from the normal history view
        #[arg(long)]
        all: bool,
        /// Print messages in full
        #[arg(long)]
        full: bool,
    },
    /// Show or change privacy preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Get suggestions based on your decisions
    Suggest {
        /// Ask a single question instead of starting a conversation
        question: Option<String>,
        /// Analyze patterns across your decisions
        #[arg(long, conflicts_with_all = ["question", "decision"])]
        patterns: bool,
        /// Deep dive into one decision
        #[arg(long, conflicts_with = "question")]
        decision: Option<String>,
    },
    /// Reflect on your decision history
    Reflect,
    /// Journal statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export your journal as JSON to stdout
    Export,
    /// Check configuration and storage health
    Doctor,
}

#[derive(Subcommand)]
enum DecisionsAction {
    /// List decisions, newest first
    List {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one decision and its conversation
    Show { id: String },
    /// Delete a decision
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Set a decision's outcome status
    Status {
        id: String,
        /// New status, e.g. completed
        status: String,
        /// What actually happened
        #[arg(long)]
        reflection: Option<String>,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Show current preferences
    Show,
    /// Change preferences
    Set {
        /// Let the assistant read your decision history
        #[arg(long)]
        share_data_with_ai: Option<bool>,
        /// Show chat history in `history`
        #[arg(long)]
        view_chat_history: Option<bool>,
    },
}

fn main() -> Result<()> {
    // API keys and storage settings may live in a .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load config (for log level)
    let config = NeuroConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let credentials = Credentials {
        email: cli.email,
        password: cli.password,
    };

    if let Command::Doctor = cli.command {
        return cli::doctor::doctor(&config);
    }

    let storage = cli::open_storage(&config)?;

    match cli.command {
        Command::Signup { name } => cli::account::signup(storage.as_ref(), &credentials, &name)?,
        Command::Login => cli::account::login(storage.as_ref(), &credentials)?,
        Command::Passwd { new_password } => {
            cli::account::passwd(storage.as_ref(), &credentials, &new_password)?
        }
        Command::Record { language } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            let provider = create_provider(&config.assistant);
            cli::record::record(storage, provider, user.id, config.recorder.clone(), language)?;
        }
        Command::Decisions { action } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            match action {
                DecisionsAction::List { limit } => cli::decisions::list(storage.as_ref(), &user.id, limit)?,
                DecisionsAction::Show { id } => cli::decisions::show(storage.as_ref(), &user.id, &id)?,
                DecisionsAction::Delete { id, yes } => {
                    cli::decisions::delete(storage.as_ref(), &user.id, &id, yes)?
                }
                DecisionsAction::Status { id, status, reflection } => {
                    cli::decisions::set_status(storage.as_ref(), &user.id, &id, &status, reflection)?
                }
            }
        }
        Command::History {
            chat_type,
            decision,
            search,
            oldest_first,
            all,
            full,
        } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            let opts = HistoryOptions {
                chat_type,
                decision_id: decision,
                search,
                oldest_first,
                include_hidden: all,
                full,
            };
            cli::history::history(storage.as_ref(), &user.id, &opts)?;
        }
        Command::Prefs { action } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            match action {
                PrefsAction::Show => cli::prefs::show(storage.as_ref(), &user.id)?,
                PrefsAction::Set {
                    share_data_with_ai,
                    view_chat_history,
                } => cli::prefs::set(
                    storage.as_ref(),
                    &user.id,
                    PreferencesUpdate {
                        share_data_with_ai,
                        view_chat_history,
                    },
                )?,
            }
        }
        Command::Suggest {
            question,
            patterns,
            decision,
        } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            let provider = create_provider(&config.assistant);
            let opts = SuggestOptions {
                question,
                patterns,
                decision_id: decision,
            };
            cli::assist::suggest(storage.as_ref(), provider, &user.id, &opts)?;
        }
        Command::Reflect => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            let provider = create_provider(&config.assistant);
            cli::assist::reflect(storage.as_ref(), provider, &user.id)?;
        }
        Command::Stats { json } => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            cli::stats::stats(storage.as_ref(), &user.id, json)?;
        }
        Command::Export => {
            let user = cli::authenticate(storage.as_ref(), &credentials)?;
            cli::export::export(storage.as_ref(), user)?;
        }
        // Runs before storage is opened
        Command::Doctor => {}
    }

    Ok(())
}
