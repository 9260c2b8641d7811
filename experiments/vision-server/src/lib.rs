use {
    serde::Serialize,
    std::sync::Arc,
    tokio::sync::mpsc,
    vision::{CameraRegistry, ControlEvent, ControlReply, TableEntries, Telemetry, UiSnapshot, control},
};

/// JSON messages the server sends to UI clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Table { channel: String, entries: TableEntries },
    Snapshot(UiSnapshot),
    Rebind { old: String, new: String },
    Reply(ControlReply),
}

#[derive(Debug, Clone)]
pub enum Wire {
    Json(Outbound),
    Binary(Vec<u8>),
}

/// Binary stream frame: channel length (u16, little endian), channel name,
/// then the JPEG bytes.
pub fn stream_message(channel: &str, jpeg: &[u8]) -> Vec<u8> {
    let name = &channel.as_bytes()[..channel.len().min(u16::MAX as usize)];
    let mut message = Vec::with_capacity(2 + name.len() + jpeg.len());
    message.extend_from_slice(&(name.len() as u16).to_le_bytes());
    message.extend_from_slice(name);
    message.extend_from_slice(jpeg);
    message
}

/// Turn worker telemetry into what goes on the wire. Stream images are JPEG
/// encoded at `quality`; an image that fails to encode is dropped.
pub fn to_wire(telemetry: Telemetry, quality: u8) -> Option<Wire> {
    match telemetry {
        Telemetry::Table { channel, entries } => Some(Wire::Json(Outbound::Table { channel, entries })),
        Telemetry::Snapshot(snapshot) => Some(Wire::Json(Outbound::Snapshot(snapshot))),
        Telemetry::Rebind { old, new } => Some(Wire::Json(Outbound::Rebind { old, new })),
        Telemetry::Frame { channel, image } => match image.to_jpeg(quality) {
            Ok(jpeg) => Some(Wire::Binary(stream_message(&channel, &jpeg))),
            Err(e) => {
                log::warn!("dropping stream frame for {}: {}", channel, e);
                None
            }
        },
    }
}

/// Answer one control event.
///
/// Events are answered in arrival order before this returns, except
/// `FinishCalibration`: it waits on the solver, so it runs on its own task
/// and its reply arrives on `replies` later. That keeps a `CancelCalibration`
/// sent meanwhile reachable.
pub async fn handle_control(
    registry: &Arc<CameraRegistry>,
    event: ControlEvent,
    replies: &mpsc::UnboundedSender<ControlReply>,
) -> Option<ControlReply> {
    if event == ControlEvent::FinishCalibration {
        let registry = Arc::clone(registry);
        let replies = replies.clone();
        tokio::spawn(async move {
            let reply = control::reply(&registry, event).await;
            if replies.send(reply).is_err() {
                log::debug!("calibration finished after the server stopped");
            }
        });
        None
    } else {
        Some(control::reply(registry, event).await)
    }
}
