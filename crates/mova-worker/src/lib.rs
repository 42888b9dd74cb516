//! Movement session worker.
//!
//! This crate provides:
//! - The session pipeline: frames in, heatmap video and analytics out
//! - Software and device edge stages
//! - The file-backed job record and pending-session scanner
//! - The polling executor with graceful shutdown

pub mod config;
pub mod edge_stage;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod scanner;
pub mod session;
pub mod store;


pub use config::{EdgeMode, EdgeSettings, SessionConfig, WorkerConfig};
pub use edge_stage::{DeviceConnector, EdgeStage, SerialConnector};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use scanner::find_pending_sessions;
pub use session::{run_session, SessionContext, SessionPaths, SessionProcessor, SessionReport};
pub use store::JobStore;
