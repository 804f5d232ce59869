use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{prompts, AgentResponse, FailureKind};
use crate::llm::{FileState, GenerateRequest, GenerativeModel, LLMError, Part, UploadedFile};

/// Uploads a video, waits for the service to process it, then asks about it
pub struct VideoAgent {
    model: Arc<dyn GenerativeModel>,
    poll_interval: Duration,
    timeout: Duration,
}

impl VideoAgent {
    pub fn new(model: Arc<dyn GenerativeModel>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            model,
            poll_interval,
            timeout,
        }
    }

    pub async fn analyze(&self, path: &Path, question: &str) -> AgentResponse {
        tracing::info!("Video agent watching {}", path.display());

        let file = match self.model.upload_file(path).await {
            Ok(file) => file,
            Err(e) => return AgentResponse::from_error("Error analyzing video", &e),
        };

        let file = match self.wait_until_processed(file).await {
            Ok(file) => file,
            Err(e) => return AgentResponse::from_error("Error analyzing video", &e),
        };

        if file.state == FileState::Failed {
            tracing::warn!("Processing failed for {}", file.name);
            return AgentResponse::failed(FailureKind::UploadFailed, "Video processing failed.");
        }

        let request = GenerateRequest::with_parts(vec![
            Part::file(&file),
            Part::text(prompts::VIDEO),
            Part::text(question),
        ]);

        match self.model.generate(&request).await {
            Ok(response) => AgentResponse::answer(response.text()),
            Err(e) => AgentResponse::from_error("Error analyzing video", &e),
        }
    }

    /// Poll until the file leaves `Processing`, bounded by the timeout
    async fn wait_until_processed(&self, mut file: UploadedFile) -> Result<UploadedFile, LLMError> {
        let started = Instant::now();
        // A timeout past the clock's range means no deadline
        let deadline = started.checked_add(self.timeout);

        while file.state == FileState::Processing {
            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(LLMError::UploadTimeout {
                        name: file.name,
                        waited: started.elapsed(),
                    });
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };

            tracing::debug!("{} still processing", file.name);
            tokio::time::sleep(pause).await;
            file = self.model.get_file(&file.name).await?;
        }

        tracing::debug!(
            "{} reached {:?} after {:.1}s",
            file.name,
            file.state,
            started.elapsed().as_secs_f64()
        );
        Ok(file)
    }
}
