use async_trait::async_trait;
use chroma_jobqueue::info::JobData;

use super::RunTransformError;
use crate::helpers::TransformParameters;

/// One kind of pipeline step.
///
/// A transform is stateless. It takes the output of the previous step
/// (or the job's input) and returns new bytes, which may have a different
/// media type. Transforms that do heavy work should do it on a blocking thread.
#[async_trait]
pub trait Transform: Sync + Send {
	/// Run this transform on `input`.
	/// `params` are this step's parameters, as submitted.
	async fn run(
		&self,
		params: TransformParameters,
		input: JobData,
	) -> Result<JobData, RunTransformError>;
}
