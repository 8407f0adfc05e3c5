//! Crawler module for run orchestration
//!
//! This module contains the core crawling logic, including:
//! - Run dispatch over the symbol universe
//! - Browser session acquisition and guaranteed release
//! - Bounded per-symbol retries and inter-symbol pacing
//! - Cancellable waits

mod controller;
mod dispatcher;
mod pacer;
mod session;

pub use controller::{
    RetryPaceController, RetryPolicy, SymbolFailure, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_PAUSE,
};
pub use dispatcher::{kst_today, Clock, Dispatcher};
pub use pacer::{Interrupted, Pacer, TokioPacer};
pub use session::{Session, SessionManager};
