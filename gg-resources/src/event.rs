use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::BatchHandle;

#[derive(Clone, Debug, PartialEq)]
pub enum LoaderEvent {
    NewBatch(BatchHandle),
    Loading { identifier: Arc<str>, priority: i32 },
    Loaded { identifier: Arc<str>, batch: BatchHandle },
    Error { identifier: Arc<str>, batch: BatchHandle },
    BatchProgress { batch: BatchHandle, progress: f32 },
    BatchComplete { batch: BatchHandle, errored: bool },
    BatchCancelled(BatchHandle),
}

#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<LoaderEvent>,
}

impl EventReceiver {
    pub fn try_recv(&self) -> Option<LoaderEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn try_iter(&self) -> impl Iterator<Item = LoaderEvent> + '_ {
        self.receiver.try_iter()
    }
}

#[derive(Debug, Default)]
pub struct EventSenders {
    senders: Vec<Sender<LoaderEvent>>,
}

impl EventSenders {
    pub fn new() -> EventSenders {
        EventSenders::default()
    }

    pub fn subscribe(&mut self) -> EventReceiver {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.senders.push(sender);
        EventReceiver { receiver }
    }

    pub fn send(&self, event: LoaderEvent) {
        if let Some((last, rest)) = self.senders.split_last() {
            for sender in rest {
                let _ = sender.send(event.clone());
            }
            let _ = last.send(event);
        }
    }
}
