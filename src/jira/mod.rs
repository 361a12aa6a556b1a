pub mod api_types;
mod cache;
pub mod client;
#[cfg(test)]
pub mod fake;
pub mod service;
pub mod types;

pub use client::JiraClient;
pub use service::IssueService;
