//! Composable asynchronous data operations.
//!
//! A [`DataOp`] is a node in a lazily evaluated graph. Evaluating it for a
//! [`DataView`](crate::coord::DataView) yields a future resolving to
//! present data, absent data, or a [`DataError`](crate::error::DataError).
//!
//! # Architecture
//!
//! ```text
//! tile source → map / flat_map → VoronoiScaleOp → cached → join2 → column slot
//! ```
//!
//! Nodes are shared by cloning. Memoization is opt-in through
//! [`DataOp::cached`]; an uncached node recomputes on every call.
//!
//! # Example
//!
//! ```ignore
//! use terragrid::dataop::{join2, DataOp};
//! use terragrid::coord::DataView;
//!
//! let a = DataOp::of_sync(|view: &DataView| view.area());
//! let b = DataOp::completed(Some(2usize));
//! let product = join2(&a, &b).map(|(a, b), _| a * b);
//!
//! assert_eq!(product.apply(DataView::square(0, 0, 4)).await?, Some(32));
//! ```

mod op;
mod pool;

pub use op::{
    join2, join3, DataOp, MemoConfig, OpFuture, DEFAULT_MEMO_CAPACITY, DEFAULT_MEMO_TTL,
};
pub use pool::{default_worker_count, WorkerPool};
