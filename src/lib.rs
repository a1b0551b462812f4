//! Health Sphere: a simulated patient no-show prediction front end.
//!
//! The prediction is synthetic (see [`model::SyntheticScorer`]). All state
//! lives in one profile store, mirroring a single browser profile.

pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pages;
pub mod repository;
pub mod server;
pub mod session;
pub mod store;
pub mod views;

pub use error::AppError;
pub use model::{compute_prediction, PredictionRecord, SyntheticScorer, VisitInput};
pub use repository::{RecordRepository, UserAccount, UserStatus};
pub use server::{AppState, Timing};
pub use store::{FileStore, KeyValueStore, MemoryStore};
