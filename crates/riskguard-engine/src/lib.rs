//! Trading-engine seam for the riskguard daemon.
//!
//! The engine is an external collaborator with unpredictable latency and
//! availability, so it sits behind the dyn-compatible [`TradingEngine`]
//! trait. Production uses [`BridgeClient`] (HTTP bridge to the terminal);
//! tests use the scriptable [`MockTradingEngine`].

pub mod bridge;
pub mod engine;
pub mod error;

pub use bridge::BridgeClient;
pub use engine::{
    BoxFuture, CloseOutcome, CloseRequest, DynTradingEngine, MockTradingEngine, TradingEngine,
};
pub use error::{EngineError, EngineResult};
