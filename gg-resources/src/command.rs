use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::error;

use crate::handle_allocator::HandleAllocator;
use crate::{BatchHandle, LoadError, ResourceLoader, ResourceRef, Submission};

pub(crate) enum Command {
    Submit(BatchHandle, Submission),
    Complete(Arc<str>, Result<ResourceRef, LoadError>),
}

impl Command {
    pub fn execute(self, loader: &mut ResourceLoader) {
        match self {
            Command::Submit(handle, submission) => {
                if let Err(error) = loader.submit_with_handle(handle, submission) {
                    error!(batch = ?handle, %error, "deferred submission failed");
                }
            }

            Command::Complete(canonical, result) => {
                loader.complete_request(&canonical, result);
            }
        }
    }
}

pub(crate) fn new_command_channel() -> (CommandSender, CommandReceiver) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (CommandSender { sender }, CommandReceiver { receiver })
}

#[derive(Debug, Clone)]
pub(crate) struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    pub fn send(&self, command: Command) {
        let _ = self.sender.send(command);
    }

    pub fn complete(&self, canonical: Arc<str>, result: Result<ResourceRef, LoadError>) {
        self.send(Command::Complete(canonical, result));
    }
}

#[derive(Debug)]
pub(crate) struct CommandReceiver {
    receiver: Receiver<Command>,
}

impl CommandReceiver {
    pub fn try_recv(&self) -> Option<Command> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Command> {
        match self.receiver.recv_timeout(timeout) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Submits batches from any thread. Submissions are applied on the next
/// [`ResourceLoader::maintain`], in the order they were sent.
#[derive(Debug, Clone)]
pub struct Submitter {
    command_sender: CommandSender,
    handle_allocator: Arc<HandleAllocator>,
}

impl Submitter {
    pub(crate) fn new(command_sender: CommandSender, handle_allocator: Arc<HandleAllocator>) -> Submitter {
        Submitter {
            command_sender,
            handle_allocator,
        }
    }

    /// The returned handle is valid as soon as the submission is applied.
    pub fn submit(&self, submission: Submission) -> BatchHandle {
        let handle = self.handle_allocator.alloc();
        self.command_sender.send(Command::Submit(handle, submission));
        handle
    }
}
