use {
    crate::*,
    image::Image,
    std::sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    tokio::sync::mpsc,
};

/// Structured telemetry namespace of a camera.
pub fn channel_name(nickname: &str) -> String {
    format!("/vision/{nickname}")
}

/// Where camera workers publish. Every call is best-effort and must return
/// without waiting on a consumer.
pub trait TelemetrySink: Send + Sync {
    /// Every result, unthrottled.
    fn publish_structured(&self, channel: &str, result: &PipelineResult);

    /// Point update for the UI, at most at the UI rate.
    fn publish_snapshot(&self, snapshot: UiSnapshot);

    /// Stream image for the UI, at most at the UI rate.
    fn publish_frame(&self, channel: &str, image: Image);

    /// A camera's namespace moved from `old` to `new`.
    fn rebind(&self, _old: &str, _new: &str) {}
}

/// Name of the camera the UI is looking at.
#[derive(Debug, Default)]
pub struct UiFocus {
    camera: Mutex<Option<String>>,
}

impl UiFocus {
    pub fn focus(&self, camera: impl Into<String>) {
        *self.camera.lock().unwrap_or_else(|e| e.into_inner()) = Some(camera.into());
    }

    pub fn focused(&self) -> Option<String> {
        self.camera.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_focused(&self, camera: &str) -> bool {
        self.camera
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
            == Some(camera)
    }
}

/// Telemetry as a message, for consumers on the other side of a channel.
#[derive(Debug, Clone)]
pub enum Telemetry {
    Table { channel: String, entries: TableEntries },
    Snapshot(UiSnapshot),
    Frame { channel: String, image: Image },
    Rebind { old: String, new: String },
}

/// Sink forwarding into a bounded tokio channel. A full channel drops the
/// message.
pub struct ChannelSink {
    tx: mpsc::Sender<Telemetry>,
    dropped: AtomicU64,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Telemetry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Messages lost to a full or closed channel.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn forward(&self, message: Telemetry) {
        if self.tx.try_send(message).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped.is_power_of_two() {
                log::debug!("telemetry channel full, {} messages dropped", dropped);
            }
        }
    }
}

impl TelemetrySink for ChannelSink {
    fn publish_structured(&self, channel: &str, result: &PipelineResult) {
        self.forward(Telemetry::Table {
            channel: channel.to_string(),
            entries: TableEntries::from(result),
        });
    }

    fn publish_snapshot(&self, snapshot: UiSnapshot) {
        self.forward(Telemetry::Snapshot(snapshot));
    }

    fn publish_frame(&self, channel: &str, image: Image) {
        self.forward(Telemetry::Frame {
            channel: channel.to_string(),
            image,
        });
    }

    fn rebind(&self, old: &str, new: &str) {
        self.forward(Telemetry::Rebind {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
}
