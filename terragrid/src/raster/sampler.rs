use super::Raster;
use crate::coord::DataView;
use crate::dataop::DataOp;
use crate::error::DataError;

/// A raster-producing op paired with the value used where it has no data.
#[derive(Debug, Clone)]
pub struct Sampler<T> {
    op: DataOp<Raster<T>>,
    default: T,
}

impl<T> Sampler<T>
where
    T: Copy + Send + Sync + 'static,
{
    pub fn new(op: DataOp<Raster<T>>, default: T) -> Self {
        Self { op, default }
    }

    pub fn default_value(&self) -> T {
        self.default
    }

    pub fn op(&self) -> &DataOp<Raster<T>> {
        &self.op
    }

    /// Samples `view`, always returning a raster of exactly the view's size.
    ///
    /// Absent data becomes a raster filled with the default value. A raster
    /// of the wrong shape is clipped or padded with the default.
    pub async fn sample(&self, view: DataView) -> Result<Raster<T>, DataError> {
        let mut out = Raster::filled(view.width(), view.height(), self.default);

        match self.op.apply(view).await? {
            Some(raster) if raster.width() == view.width() && raster.height() == view.height() => {
                Ok(raster)
            }
            Some(raster) => {
                let src_view = DataView::rect(view.x(), view.y(), raster.width(), raster.height());
                out.copy_from(&view, &raster, &src_view);
                Ok(out)
            }
            None => Ok(out),
        }
    }

    /// Wraps the sampler back into an op that is never absent.
    pub fn into_op(self) -> DataOp<Raster<T>> {
        let sampler = self;
        DataOp::of(move |view| {
            let sampler = sampler.clone();
            async move { sampler.sample(view).await.map(Some) }
        })
    }
}
