//! Deployed Application API Module
//!
//! REST client for the application under test. Verification runs use it to
//! trigger the actions (image upload, notification subscription) whose log
//! lines they then wait for.

#![warn(clippy::all, rust_2018_idioms)]

pub mod client;
pub mod types;

pub use client::AppApiClient;
pub use types::{ApiResponse, AppAction, ImageRecord, Subscription};
