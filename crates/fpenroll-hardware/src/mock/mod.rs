//! Mock gateway implementations for testing and development.
//!
//! Every mock records the calls it receives into a shared [`CallLog`], so a
//! test can assert ordering across gateways (for example that the indicator
//! was hidden before the driver was asked to cancel).

pub mod call_log;
pub mod daemon;
pub mod indicator;
pub mod sink;
pub mod store;

// Re-export commonly used types
pub use call_log::{CallLog, GatewayCall};
pub use daemon::{MockDaemon, MockDaemonHandle};
pub use indicator::MockIndicator;
pub use sink::RecordingSink;
pub use store::MemoryTemplateStore;
