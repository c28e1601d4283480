//! Bounded-concurrency request dispatching.
//!
//! ```text
//!  submit(url, completion)
//!          │
//!          ▼
//!  ┌──────────────┐  admit (in_flight < max)  ┌───────────────┐
//!  │ PendingQueue │ ────────────────────────► │ Transport::get│ (spawned task)
//!  │    (FIFO)    │ ◄──────────────────────── │               │
//!  └──────────────┘   completion frees slot   └───────────────┘
//!                                                     │
//!                                                     ▼
//!                                           completion(ResponseOutcome)
//! ```
//!
//! Each submission and each completion admits at most one queued request.

mod core;
mod outcome;
mod queue;

pub use self::core::Dispatcher;
pub use outcome::ResponseOutcome;
pub use queue::{Completion, PendingQueue, QueuedRequest};
