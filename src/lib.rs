//! Clonebot
//!
//! Decision core of an autonomous social-media engagement agent that posts
//! in the voice of a text model trained on someone's writing.
//!
//! # Features
//!
//! - **Pester budget**: per-user allowance for unprompted replies
//! - **Interest scoring**: keyword overlap against the model's top keywords
//! - **Engagement policy**: probabilistic favorite / re-share / reply
//! - **Follow gate**: only the owner and the owner's followers are followed
//! - **Schedule**: recurring unprompted posts, re-armable at runtime
//! - **Owner alerts**: log line plus private message to the owner
//!
//! # Architecture
//!
//! ```text
//! event stream ──► EventHandler ──► CloneBot ──► Transport
//!                                     │
//!                                     ├── PesterLedger
//!                                     ├── KeywordSet + classify
//!                                     ├── EngagementPolicy
//!                                     ├── FollowGate
//!                                     ├── ScheduleManager
//!                                     └── AlertSink
//! ```

pub mod agent;
pub mod alert;
pub mod config;
pub mod follow_gate;
pub mod interest;
pub mod ledger;
pub mod model;
pub mod policy;
pub mod schedule;
pub mod tokenizer;
pub mod transport;

pub use agent::{dispatch, CloneBot, Deferrer, EventHandler, InboundEvent, ReplyContext};
pub use alert::AlertSink;
pub use config::{Config, ConfigError, FollowPolicy, Owner};
pub use follow_gate::FollowGate;
pub use interest::{classify, EngagementTier, KeywordSet};
pub use ledger::{PesterLedger, UserRecord};
pub use model::{CorpusLoader, CorpusModel, ModelError, ModelLoader, Preloaded, TextModel};
pub use policy::{
    Action, ContentKind, DelayRange, EngagementOdds, EngagementPolicy, RandomSource,
};
pub use schedule::{
    IntervalSpec, JobScheduler, ScheduleError, ScheduleHandle, ScheduleManager, TokioJobScheduler,
};
pub use tokenizer::{Tokenizer, WordTokenizer};
pub use transport::{
    DirectMessage, DryRunTransport, MemoryTransport, Post, ReplyTarget, Transport, TransportError,
};
