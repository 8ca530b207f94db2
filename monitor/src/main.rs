use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use generator::{DirectorySource, SceneConfig, SyntheticCamera};
use log::{debug, info, warn};
use mailer::{SmtpNotifier, SmtpSettings};
use motioncore::imaging::Overlay;
use motioncore::interface::FrameSource;
use motioncore::output::{DiskSnapshotWriter, EventHandler, EventSink, Notifier};
use motioncore::telemetry::MetricsRecorder;
use motioncore::MotionPipeline;
use preview::{FramePreview, PreviewBridge};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::MonitorConfig;
use workflow::runner::Runner;

mod generator;
mod mailer;
mod preview;
mod workflow;

const EVENT_QUEUE_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Generated scene with a periodic intruder.
    Synthetic,
    /// Still images replayed from `--frames-dir`.
    Replay,
}

#[derive(Parser)]
#[command(author, version, about = "Camera motion monitor")]
struct Args {
    /// Path to the YAML or JSON configuration
    #[arg(short = 'c', long = "conf")]
    conf: PathBuf,
    #[arg(long, value_enum, default_value_t = SourceKind::Synthetic)]
    source: SourceKind,
    /// Directory of frames for the replay source
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Pace synthetic frames at the configured fps
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = MonitorConfig::load(&args.conf)?;

    let metrics = Arc::new(MetricsRecorder::new());
    let mut pipeline = MotionPipeline::new(&config.to_pipeline_config(), metrics.clone())
        .context("building motion pipeline")?;
    if let Some(font_path) = config.font_path.as_ref() {
        debug!("[monitor] overlay font {}", font_path.display());
        pipeline = pipeline.with_overlay(
            Overlay::with_font_file(font_path).context("loading overlay font")?,
        );
    }

    let sink = build_sink(&config, metrics)?;
    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(stop.clone());

    let mut runner = Runner::new(pipeline, sink, stop.clone())
        .with_warmup(Duration::from_secs_f64(config.camera_warmup_time))
        .with_max_frames(args.max_frames);
    if config.show_video {
        let preview = FramePreview::new(&config.preview_path);
        info!("[monitor] preview frames go to {}", preview.path().display());
        runner = runner.with_preview(Box::new(preview));
    }
    if config.preview_http {
        let preview = PreviewBridge::start(config.preview_addr, stop)
            .context("starting preview bridge")?;
        warn!(
            "[monitor] preview_http is set: listening on http://{}/status",
            preview.local_addr()
        );
        runner = runner.with_preview(Box::new(preview));
    }

    let mut source = build_source(&args, &config)?;
    let summary = runner.run(&mut source)?;
    info!(
        "[monitor] stopped after {} frames with {} events{}",
        summary.frames,
        summary.metrics.events,
        if summary.stopped { " (stop requested)" } else { "" }
    );
    if let Some(pair) = summary.last_snapshot {
        info!("[monitor] last snapshot {}", pair.annotated_path.display());
    }
    Ok(())
}

fn build_sink(config: &MonitorConfig, metrics: Arc<MetricsRecorder>) -> anyhow::Result<EventSink> {
    let writer = DiskSnapshotWriter::new(&config.output_dir);
    for dir in writer.missing_dirs() {
        warn!(
            "[monitor] snapshot directory {} does not exist; snapshots will fail",
            dir.display()
        );
    }

    let notifier: Option<Box<dyn Notifier + Send>> = if config.use_email {
        let settings = SmtpSettings {
            server: config.smtp_server.clone(),
            port: config.smtp_port,
            account: config.email_account.clone(),
            password: config.email_pwd.clone(),
            recipients: config.dest_email_account.addresses(),
        };
        let notifier = SmtpNotifier::new(&settings).context("configuring smtp notifier")?;
        Some(Box::new(notifier))
    } else {
        None
    };

    let handler = EventHandler::new(
        Box::new(writer),
        notifier,
        config.notification_message(),
        metrics,
    );
    Ok(if config.offload_events {
        EventSink::worker(handler, EVENT_QUEUE_CAPACITY)
    } else {
        EventSink::inline(handler)
    })
}

fn build_source(args: &Args, config: &MonitorConfig) -> anyhow::Result<Box<dyn FrameSource>> {
    match args.source {
        SourceKind::Synthetic => {
            let (width, height) = config.resolution;
            let scene = SceneConfig {
                width,
                height,
                fps: config.fps,
                seed: args.seed,
                realtime: args.realtime,
                ..Default::default()
            };
            Ok(Box::new(SyntheticCamera::new(scene)))
        }
        SourceKind::Replay => {
            let Some(dir) = args.frames_dir.as_ref() else {
                bail!("--source replay needs --frames-dir");
            };
            let source = DirectorySource::open(dir, args.realtime.then_some(config.fps))?;
            if source.is_empty() {
                warn!("[monitor] no frames found in {}", dir.display());
            } else {
                info!("[monitor] replaying {} frames from {}", source.len(), dir.display());
            }
            Ok(Box::new(source))
        }
    }
}

/// Raises `stop` on Ctrl+C so the loop can drain queued events and exit.
fn watch_ctrl_c(stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        let runtime = match TokioBuilder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("[monitor] Ctrl+C handling unavailable: {}", err);
                return;
            }
        };
        runtime.block_on(async {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("[monitor] Ctrl+C received, stopping");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(err) => warn!("[monitor] Ctrl+C handling unavailable: {}", err),
            }
        });
    });
}
