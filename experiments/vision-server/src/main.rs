use {
    base::log::LevelFilter,
    com::{ComError, WsServer},
    std::sync::Arc,
    tokio::sync::mpsc,
    video::{CaptureConfig, CaptureSource, TestPattern},
    vision::{CameraRegistry, CameraSetup, ChannelSink, ControlEvent, VisionConfig, control},
    vision_server::{Outbound, Wire, handle_control, to_wire},
};

const DEFAULT_ADDR: &str = "0.0.0.0:5800";
const TELEMETRY_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = base::level_from_env("VISION_LOG", LevelFilter::Info);
    match std::env::var("VISION_LOG_DIR") {
        Ok(dir) => base::init_file_logger(dir, level)?,
        Err(_) => base::init_stdout_logger(level),
    }

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let config = VisionConfig::from_env();
    let quality = config.stream_quality();
    let camera_count = std::env::var("VISION_CAMERAS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);

    let (sink, mut telemetry) = ChannelSink::new(TELEMETRY_CAPACITY);
    let registry = Arc::new(CameraRegistry::new(config, Arc::new(sink)));
    for i in 0..camera_count {
        let name = format!("pattern-{i}");
        let (source, controls) = CaptureSource::open(
            TestPattern::new(),
            CaptureConfig::default().with_name(name.clone()),
        )
        .await?;
        registry.attach(CameraSetup::new(name, Box::new(source), Arc::new(controls)))?;
    }

    let mut server = WsServer::<ControlEvent>::bind(&addr).await?;
    log::info!("vision server listening on {}", server.local_addr());

    let (reply_tx, mut replies) = mpsc::unbounded_channel();
    loop {
        tokio::select! {
            event = server.recv() => match event {
                Ok(event) => {
                    log::debug!("control event: {:?}", event);
                    if let Some(reply) = handle_control(&registry, event, &reply_tx).await {
                        server.send_json(&Outbound::Reply(reply)).await?;
                    }
                }
                Err(ComError::ConnectionClosed) => break,
                Err(e) => {
                    let reply = control::rejected(&registry, e.to_string());
                    server.send_json(&Outbound::Reply(reply)).await?;
                }
            },
            Some(reply) = replies.recv() => {
                server.send_json(&Outbound::Reply(reply)).await?;
            }
            Some(message) = telemetry.recv() => {
                match to_wire(message, quality) {
                    Some(Wire::Json(outbound)) => server.send_json(&outbound).await?,
                    Some(Wire::Binary(payload)) => server.send_binary(payload).await,
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
        }
    }

    registry.shutdown();
    Ok(())
}
