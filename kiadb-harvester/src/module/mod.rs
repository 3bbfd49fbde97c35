pub mod discovery;
pub mod explorer;
pub mod fetcher;
pub mod orchestrator;
pub mod output;
pub mod state;
pub mod transport;
