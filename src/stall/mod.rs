//! Cache-stall detection across node timelines
//!
//! A call-out task stalls when its node sits idle waiting for projects that
//! turn out to be pure cache reads. Such waits are scheduling defects: the
//! results were available, yet the requesting node could not proceed until
//! another node got around to serving them.
//!
//! Not every such wait is a defect. If the requested targets were genuinely
//! being built elsewhere during the wait window, the later cache read is a
//! timing artifact (a "false cache execution") and is filtered out.
//!
//! # Algorithm
//!
//! ```text
//! for each finished call-out task T (ascending key order):
//!   1. every child context of T is a cached execution
//!   2. T requested at least one named target
//!   3. duration(T) >= noise floor
//!   4. T's node timeline has no other context starting in (T.start, T.finish)
//!   for each child C with C.start - T.start >= noise floor:
//!     5. walk C's node timeline backward from C.start, stopping at the
//!        first entry finishing before T.start; entries on a node other
//!        than T's become contributors
//!     6. drop C if a contributor of C's project executed a target T asked for
//!     7. keep C with its contributors
//!   report T if any child survived
//! ```

mod detector;
mod report;

pub use detector::{detect_stalls, StallDetector};
pub use report::{format_duration, Contributor, ContributorExecution, StallReport, StalledChild};
