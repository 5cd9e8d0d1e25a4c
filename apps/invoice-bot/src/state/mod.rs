//! # State Module
//!
//! In-memory runtime state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │    Database      │  │    Sessions      │  │  BotConfig/Machine   │  │
//! │  │  (invoice-db)    │  │  user → Arc<     │  │                      │  │
//! │  │                  │  │   Mutex<Cart>>   │  │  read-only after     │  │
//! │  │  durable         │  │  lost on restart │  │  startup             │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: store-wide write lock inside                              │
//! │  • Sessions: one tokio Mutex per user, held for a whole message        │
//! │  • Config/Machine: shared immutably                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod session;

pub use session::{SessionHandle, Sessions};
