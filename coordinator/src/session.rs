use comms::specs::PipelineSizes;
use tokio::runtime::Runtime;

use crate::{LocalPipeline, PipelineState, Result};

/// A running pipeline that can be driven from synchronous code.
///
/// It owns the runtime its stages run on, so dropping the session
/// aborts every stage.
pub struct Session {
    runtime: Runtime,
    pipeline: LocalPipeline,
}

impl Session {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `runtime` - The runtime the pipeline's stages were spawned on.
    /// * `pipeline` - A pipeline that completed its handshake.
    pub(crate) fn new(runtime: Runtime, pipeline: LocalPipeline) -> Self {
        Self { runtime, pipeline }
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn sizes(&self) -> Option<PipelineSizes> {
        self.pipeline.sizes()
    }

    /// Blocks until the pipeline evaluated `params`.
    ///
    /// See [`crate::Pipeline::evaluate`].
    pub fn evaluate(&mut self, params: &[f64]) -> Result<Option<Vec<f64>>> {
        self.runtime.block_on(self.pipeline.evaluate(params))
    }

    /// Blocks until every stage disconnected.
    pub fn terminate(&mut self) -> Result<()> {
        self.runtime.block_on(self.pipeline.terminate())
    }
}
