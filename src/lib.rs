//! Bridges a flow-based automation runtime to a conversational
//! voice-assistant platform.
//!
//! The transport (out of scope here) delivers one webhook payload plus one
//! single-use response channel per dialog turn. The [`router::SessionRouter`]
//! normalizes the payload into a [`turn::Turn`], keeps the conversation ↔
//! channel binding alive in its [`session::SessionTable`], hands the turn to
//! a [`router::TurnConsumer`], and synthesizes the consumer's
//! [`answer::Answer`] back into the platform's wire format. Every call gets
//! exactly one disposition, even when the consumer stalls or a platform
//! retry races an in-flight turn.
//!
//! ```no_run
//! use std::sync::Arc;
//! use action_bridge::{Answer, BridgeConfig, SessionRouter, Turn, TurnConsumer};
//!
//! struct Greeter;
//!
//! #[async_trait::async_trait]
//! impl TurnConsumer for Greeter {
//!     async fn on_turn(&self, turn: Turn) -> anyhow::Result<Answer> {
//!         Ok(Answer::ask(format!("you said {}", turn.raw_input.unwrap_or_default())))
//!     }
//! }
//!
//! let router = SessionRouter::new(Arc::new(Greeter), BridgeConfig::default());
//! // hand `router` to the transport; it calls `router.handle_turn(...)`
//! // once per inbound webhook call
//! ```

pub mod answer;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalizer;
pub mod router;
pub mod session;
pub mod synthesizer;
pub mod turn;
pub mod wire;

pub use answer::{Answer, AnswerPayload, RichReply, SelectionList, Speech};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use normalizer::{normalize, normalize_value};
pub use router::{SessionRouter, TurnConsumer};
pub use session::{Disposition, ReplySlot, SessionTable};
pub use synthesizer::synthesize;
pub use turn::{Turn, TurnIntent, TurnValue};
pub use wire::{AppResponse, WebhookRequest};
