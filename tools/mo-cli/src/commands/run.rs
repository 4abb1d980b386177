//! Run a tracking session with synthetic collaborators.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use mo_capture_engine::synthetic::{
    NullSink, OrbitingFaceDetector, ScriptedClassifier, SyntheticCamera, TracingDisplay,
};
use mo_capture_engine::{
    CaptureLoopManager, Collaborators, EmotionClassifier, FileHandoffClassifier,
};
use mo_common::config::AppConfig;

#[derive(Args)]
pub struct RunArgs {
    /// Synthetic frame width
    #[arg(long, default_value = "640")]
    width: u32,

    /// Synthetic frame height
    #[arg(long, default_value = "480")]
    height: u32,

    /// Synthetic camera rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    duration: Option<f64>,

    /// Emotion labels the scripted classifier cycles through
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "neutral,happy,surprise,sad"
    )]
    emotions: Vec<String>,

    /// Report absolute positions instead of offsets from the zero pose
    #[arg(long)]
    absolute: bool,

    /// Disable the debug overlay
    #[arg(long)]
    no_display: bool,

    /// Snapshot print interval (ms)
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Print snapshots as JSON
    #[arg(long)]
    json: bool,

    /// Classify from frames written to the configured capture file
    #[arg(long)]
    handoff: bool,
}

pub async fn run(config: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let mut tracking = config.tracking;
    if args.absolute {
        tracking.features.absolute_position = true;
    }
    if args.no_display {
        tracking.features.show_display = false;
    }

    println!("Starting tracking session");
    println!("  Camera: synthetic {}x{} @ {}fps", args.width, args.height, args.fps);
    println!("  Emotions: {}", args.emotions.join(", "));
    if args.handoff {
        println!("  Capture file: {}", tracking.loops.capture_file.display());
    }
    println!(
        "  Position: {}",
        if tracking.features.absolute_position {
            "absolute"
        } else {
            "relative to zero pose"
        }
    );
    println!();

    let scripted = ScriptedClassifier::new(args.emotions);
    let classifier: Box<dyn EmotionClassifier> = if args.handoff {
        Box::new(FileHandoffClassifier::from_config(scripted, &tracking.loops))
    } else {
        Box::new(scripted)
    };
    let collaborators = Collaborators {
        camera: Box::new(SyntheticCamera::new(args.width, args.height, args.fps)),
        detector: Box::new(OrbitingFaceDetector::default()),
        classifier,
        scene: Arc::new(NullSink),
        display: Some(Box::new(TracingDisplay::new())),
    };
    let mut manager = CaptureLoopManager::new(tracking, collaborators);
    manager.start()?;

    match args.duration {
        Some(secs) => println!("Running for {secs:.1}s..."),
        None => println!("Press Ctrl+C to stop tracking..."),
    }
    println!();

    let duration = args.duration;
    let stop_after = async move {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(stop_after);

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => print_snapshot(&manager, args.json)?,
            _ = &mut stop_after => break,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                println!();
                break;
            }
        }
    }

    // stop() joins the loop threads; keep it off the async workers.
    let (manager, stats) = tokio::task::spawn_blocking(move || {
        let stats = manager.stop();
        (manager, stats)
    })
    .await?;
    let stats = stats?;

    println!("Session stopped after {:.1}s", manager.uptime_secs().unwrap_or_default());
    println!("  Frames captured: {}", stats.frames_captured);
    println!("  Poses tracked: {}", stats.poses_tracked);
    println!("  Detection misses: {}", stats.detection_misses);
    println!("  Emotions classified: {}", stats.emotions_classified);
    println!("  Scene updates: {}", stats.scene_updates);
    if stats.collaborator_panics > 0 {
        println!("  Collaborator panics: {}", stats.collaborator_panics);
    }

    Ok(())
}

fn print_snapshot(manager: &CaptureLoopManager, json: bool) -> anyhow::Result<()> {
    match manager.snapshot() {
        Ok(snapshot) if snapshot.is_empty() => println!("Waiting for a face to calibrate on..."),
        Ok(snapshot) if json => println!("{}", serde_json::to_string(&snapshot)?),
        Ok(snapshot) => println!("{}", snapshot.lines().join("  ")),
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot unavailable");
            println!("Snapshot unavailable: {e}");
        }
    }
    Ok(())
}
