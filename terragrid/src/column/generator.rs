//! Evaluation of registered data ops into a [`ColumnData`].

use std::sync::Arc;
use std::time::Instant;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, warn};

use super::data::ColumnData;
use super::keys::DataKey;
use crate::coord::{ColumnPos, DataView};
use crate::dataop::DataOp;
use crate::error::DataError;

type Assign = Box<dyn FnOnce(&mut ColumnData) + Send>;
type Evaluate = Box<dyn Fn(DataView) -> BoxFuture<'static, Result<Assign, DataError>> + Send + Sync>;

struct Registration {
    name: &'static str,
    evaluate: Evaluate,
}

/// The set of data ops that make up a column.
///
/// All registered ops are applied concurrently to the column's view. The
/// bundle is only built once every op has resolved, and any failure fails
/// the whole column.
#[derive(Default)]
pub struct ColumnDataGenerator {
    registrations: Vec<Registration>,
}

impl ColumnDataGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<K: DataKey>(mut self, op: DataOp<K::Value>) -> Self {
        self.register::<K>(op);
        self
    }

    /// Registers the op producing `K`, replacing any earlier registration.
    pub fn register<K: DataKey>(&mut self, op: DataOp<K::Value>) {
        self.registrations.retain(|r| r.name != K::NAME);

        let evaluate: Evaluate = Box::new(move |view| {
            op.apply(view)
                .map(|result| {
                    result.map(|value| {
                        let value = value.map(Arc::new);
                        Box::new(move |data: &mut ColumnData| data.put::<K>(value)) as Assign
                    })
                })
                .boxed()
        });

        self.registrations.push(Registration {
            name: K::NAME,
            evaluate,
        });
    }

    /// Names of the registered keys.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.iter().map(|r| r.name)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Computes the bundle for `pos`.
    ///
    /// Every op is applied before this returns. The returned future polls
    /// them together and assembles the result.
    pub fn generate(&self, pos: ColumnPos) -> BoxFuture<'static, Result<ColumnData, DataError>> {
        let view = DataView::of_column(pos);
        let started = Instant::now();

        let pending: Vec<BoxFuture<'static, Result<Assign, DataError>>> = self
            .registrations
            .iter()
            .map(|r| {
                let name = r.name;
                (r.evaluate)(view)
                    .map(move |result: Result<Assign, DataError>| {
                        result.inspect_err(|e| {
                            warn!(column = %pos, key = name, error = %e, "Column data key failed");
                        })
                    })
                    .boxed()
            })
            .collect();
        let count = pending.len();

        async move {
            let assigns = try_join_all(pending).await?;

            let mut data = ColumnData::empty(pos);
            for assign in assigns {
                assign(&mut data);
            }

            debug!(
                column = %pos,
                keys = count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Column data assembled"
            );
            Ok(data)
        }
        .boxed()
    }
}

impl std::fmt::Debug for ColumnDataGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDataGenerator")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}
