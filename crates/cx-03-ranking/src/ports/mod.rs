//! Ports module for the Ranking Processor

pub mod inbound;
pub mod outbound;

pub use inbound::RankingApi;
