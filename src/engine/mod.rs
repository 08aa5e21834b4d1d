//! Arbitrage engine: price aggregation, detection, sizing and execution

pub mod aggregator;
pub mod balances;
pub mod context;
pub mod cycle;
pub mod detector;
pub mod execution;
pub mod retry;
pub mod sizer;
pub mod types;

pub use aggregator::{PriceAggregator, PriceSnapshot};
pub use balances::{AvailableFunds, BalanceSnapshot, BalanceTracker};
pub use context::{ServiceContext, NOTIFICATION_DRAIN_TIMEOUT};
pub use cycle::{CycleLoop, CycleReport, CycleState, EngineSettings};
pub use detector::OpportunityDetector;
pub use execution::ExecutionCoordinator;
pub use retry::RetryPolicy;
pub use sizer::RiskSizer;
pub use types::{net_profit_pct, Opportunity, SizedOpportunity, TradeResult};
