//! Where job failures are reported.

use std::sync::Arc;

use tracing::warn;

use crate::marshal::UiMarshal;

/// Receives one notification per failed job.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, job_name: &str, error: &anyhow::Error);
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &anyhow::Error) + Send + Sync,
{
    fn on_error(&self, job_name: &str, error: &anyhow::Error) {
        self(job_name, error)
    }
}

/// Sink that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn on_error(&self, job_name: &str, error: &anyhow::Error) {
        warn!(job = job_name, "job dropped after error: {:#}", error);
    }
}

/// Sink that shows a user-facing message on the presentation thread.
pub struct MarshalErrorSink {
    marshal: Arc<dyn UiMarshal>,
    show: Arc<dyn Fn(String) + Send + Sync>,
}

impl MarshalErrorSink {
    pub fn new<F>(marshal: Arc<dyn UiMarshal>, show: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            marshal,
            show: Arc::new(show),
        }
    }

    pub fn message(job_name: &str, error: &anyhow::Error) -> String {
        format!("Error with job {}: {:#}.", job_name, error)
    }
}

impl ErrorSink for MarshalErrorSink {
    fn on_error(&self, job_name: &str, error: &anyhow::Error) {
        let message = Self::message(job_name, error);
        let show = self.show.clone();
        self.marshal
            .run_on_presentation_thread(Box::new(move || show(message)));
    }
}
