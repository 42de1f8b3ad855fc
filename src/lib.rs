//! NeuroLinker: a conversational decision journal.
//!
//! A user describes a decision in conversation; the assistant asks for what is
//! missing until the decision's goal, constraints, alternatives, final choice
//! and reasoning are known, then the decision is saved together with the
//! conversation that produced it. Saved decisions feed suggestions,
//! reflections and statistics.
//!
//! | Record | Holds | Identity |
//! |--------|-------|----------|
//! | **User** | Email, name, password hash | Integer (local) or generated key (remote) |
//! | **Decision** | Description, goal, constraints, alternatives, choice, reasoning, outcome | UUID |
//! | **Chat message** | One (user, assistant) exchange, optionally linked to a decision | Integer or generated key |
//! | **Preferences** | `share_data_with_ai`, `view_chat_history` | Owner |
//!
//! # Architecture
//!
//! - **Storage**: JSON array files on disk, or a Firestore document database
//!   when credentials are configured. Chosen once at startup.
//! - **Assistant**: Groq chat completions (OpenAI-compatible) with a disabled
//!   fallback, so every flow still works offline.
//! - **Languages**: English and Hindi, detected per message from the share of
//!   Devanagari characters.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`storage`]: The storage contract, local and remote stores, backend selection
//! - [`documents`]: Document database abstraction (in-memory and Firestore)
//! - [`recorder`]: Slot-filling decision recorder and recording sessions
//! - [`assistant`]: Completion providers, suggestions and reflection
//! - [`analytics`]: Journal statistics
//! - [`language`]: Language detection
//! - [`identity`]: Password hashing and id generation

pub mod analytics;
pub mod assistant;
pub mod config;
pub mod documents;
pub mod identity;
pub mod language;
pub mod recorder;
pub mod storage;
