mod actor;
mod digest;

mod domain;
pub use domain::config;

pub use actor::{
  PoolHandle, SendError, WorkerPool,
  message::{Item, PoolCommand, Token},
  pipeline::{
    CombineStage, FANOUT, MultiHashStage, PipelineError, PipelineRunner, SingleHashStage, Stage, combine_results,
    fan_out, run_signer_pipeline, sign_item,
  },
  worker::WorkerSink,
};
pub use digest::{DigestError, DigestService, RateLimited, SignerService};
