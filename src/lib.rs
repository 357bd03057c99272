//! Gmail Auto-Responder
//!
//! An unattended out-of-office responder: it authorizes once, then keeps
//! polling the inbox for unread messages that are not part of a reply chain,
//! sends each a fixed auto-reply and moves it under a dedup label so it is
//! never answered twice.
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_autoresponder::{
//!     auth::{self, Authenticator, InstalledAppFlow},
//!     client::ProductionMailboxClient,
//!     composer::AutoReplyComposer,
//!     credential_store::FileCredentialStore,
//!     label_resolver::LabelResolver,
//!     responder::{Responder, ResponderContext},
//!     scheduler::{PollScheduler, TokioTimer},
//!     config::ScheduleConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Authenticator::new(
//!         FileCredentialStore::new("token.json"),
//!         InstalledAppFlow::new("credentials.json"),
//!     )
//!     .authorize()
//!     .await?;
//!
//!     let client = ProductionMailboxClient::new(auth::connect_gmail_hub(&session).await?);
//!     let label = LabelResolver::new(&client).resolve("open-in-app-backend").await?;
//!
//!     let responder = Responder::new(
//!         client,
//!         AutoReplyComposer::new(),
//!         ResponderContext::new(label, "INBOX"),
//!     );
//!     let mut scheduler = PollScheduler::from_config(&ScheduleConfig::default())?;
//!     responder.run_forever(&mut scheduler, &TokioTimer).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authorization and Gmail API hub construction
//! - [`client`] - Mailbox capability trait and its Gmail implementation
//! - [`cli`] - Command-line interface
//! - [`composer`] - Auto-reply composition
//! - [`config`] - Configuration management
//! - [`credential_store`] - Persisted authorization token
//! - [`error`] - Error types and result aliases
//! - [`label_resolver`] - Dedup label lookup
//! - [`models`] - Core data structures
//! - [`responder`] - The poll, reply and relabel loop
//! - [`scheduler`] - Randomized poll delays

pub mod auth;
pub mod cli;
pub mod client;
pub mod composer;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod label_resolver;
pub mod models;
pub mod responder;
pub mod scheduler;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{Credential, Header, Label, Message, ReplyPayload};

pub use auth::{AuthorizedSession, Authenticator, InteractiveFlow, SessionOrigin};
pub use client::{MailboxClient, ProductionMailboxClient};
pub use composer::{AutoReplyComposer, ReplyComposer};
pub use config::{Config, ResponderConfig, ScheduleConfig};
pub use credential_store::{CredentialStore, FileCredentialStore};
pub use label_resolver::{LabelResolver, ResolvedLabel};
pub use responder::{MessageOutcome, Responder, ResponderContext, TickReport};
pub use scheduler::{PollScheduler, Timer, TokioTimer};
