use log::debug;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Notifications consumed by the visualization panels. Each kind carries the
/// payload the panels key their cache invalidation off.
#[derive(Clone, Debug, PartialEq)]
pub enum VisualizationEvent {
    TrackReordered { track: String, old_position: usize, new_position: usize },
    /// `None` means every sequence changed layout.
    SequencesLayoutChanged { sequence: Option<String> },
    SequenceReordered { sequence: String, old_position: usize, new_position: usize },
    WindowSizeChanged { old_size: u32, new_size: u32 },
    MarginChanged { old_margin: u32, new_margin: u32 },
    RedrawRequested,
}

/// Publish/subscribe over channels. Every subscriber sees events in publish order.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<VisualizationEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<VisualizationEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: VisualizationEvent) {
        debug!("[EVENTS] {:?} -> {} subscribers", event, self.subscribers.len());
        // Subscribers whose receiver was dropped are forgotten.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
