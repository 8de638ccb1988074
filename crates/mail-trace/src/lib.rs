//! followmail trace engine
//!
//! Follows messages through a postfix mail log: finds the records that name
//! a sender or recipient, then gathers every record sharing their queue id
//! until the message leaves the queue.
//!
//! # Modules
//!
//! - [`parser`]: six-group line grammar producing [`LogRecord`](followmail_core::LogRecord)s
//! - [`source`]: reopenable plain or gzip inputs and the line-pass driver
//! - [`filter`]: validated seed criteria
//! - [`correlator`]: rescan and buffered queue-id correlation
//! - [`report`]: main scan, sort and truncate
//! - [`error`]: domain error type
//!
//! # Flow
//!
//! ```text
//! LogSource --lines--> LineGrammar --records--> FilterCriteria --seeds--> Correlator
//!                                                                            |
//!                                               Report <-- sort/truncate <---+
//! ```

pub mod correlator;
pub mod error;
pub mod filter;
pub mod parser;
pub mod report;
pub mod source;

// --- re-exports ---

pub use correlator::{
    BufferedCorrelator, CorrelationStrategy, Correlator, RescanCorrelator, TerminalMarker,
};
pub use error::TraceError;
pub use filter::{AddressSyntax, FilterCriteria, FilterCriteriaBuilder};
pub use parser::LineGrammar;
pub use report::{Report, ReportBuilder, ReportRow, ScanStats};
pub use source::{FileSource, LogSource, MemorySource};
