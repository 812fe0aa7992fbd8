//! Orchestration of the detectors and the collaborator interface used to reach them.

pub mod client;
mod service;

pub use client::{AnalysisTransport, ClientError, DashboardClient, HttpTransport, InProcessTransport};
pub use service::AnalysisService;
