//! # roadhelp-client
//!
//! The requester and helper halves of the dispatch workflow:
//!
//! - [`session`]: per-session state cell and the derived request phase
//! - [`api`]: request/response calls against the record store
//! - [`channel`]: the realtime channel, its handler registry and transport
//! - [`position`]: where the device is
//! - [`dashboard`]: the requester workflow (`Idle → Pending → Matched`)
//! - [`helper`]: the helper workflow (hear about requests, accept one)
//! - [`rendezvous`]: read-only projection once matched

pub mod api;
pub mod channel;
pub mod dashboard;
pub mod helper;
pub mod position;
pub mod rendezvous;
pub mod session;

pub use api::{DispatchApi, HttpDispatchApi};
pub use channel::RealtimeChannel;
pub use dashboard::{HelpDashboard, UserNotice};
pub use helper::HelperDesk;
pub use rendezvous::RendezvousView;
pub use session::{RequestPhase, SessionState, SessionStore};
