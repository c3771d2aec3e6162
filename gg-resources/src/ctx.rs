use std::sync::Arc;

use eyre::Result;

use crate::{BatchHandle, Source, Submission, Submitter};

/// What a handler sees of the loader while its pipeline runs.
pub struct LoadCtx {
    source: Arc<dyn Source>,
    submitter: Submitter,
    batch: BatchHandle,
    priority: i32,
}

impl LoadCtx {
    pub(crate) fn new(
        source: Arc<dyn Source>,
        submitter: Submitter,
        batch: BatchHandle,
        priority: i32,
    ) -> LoadCtx {
        LoadCtx {
            source,
            submitter,
            batch,
            priority,
        }
    }

    /// The first batch that asked for the resource being loaded.
    pub fn batch(&self) -> BatchHandle {
        self.batch
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn read_bytes(&mut self, identifier: &str) -> Result<Vec<u8>> {
        self.source.read_bytes(identifier)
    }

    pub fn read_string(&mut self, identifier: &str) -> Result<String> {
        self.source.read_string(identifier)
    }

    /// Submits a child batch of [`batch`](Self::batch) unless the submission
    /// names another parent. The child is attached before this pipeline's
    /// own result is applied, so the parent batch can't complete without it.
    pub fn submit(&mut self, submission: Submission) -> BatchHandle {
        let submission = match submission.parent {
            Some(_) => submission,
            None => submission.parent(self.batch),
        };

        self.submitter.submit(submission)
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }
}
