//! Offline filter simulation: step response of the head filter.

use mo_common::config::AppConfig;
use mo_pose_model::{Transform, Vector3};
use mo_processing_core::FilterPipeline;
use serde::Serialize;

#[derive(Serialize)]
struct Step {
    frame: usize,
    position: Vector3,
    rotation: Vector3,
    remaining: f64,
}

pub fn run(
    config: &AppConfig,
    target: &str,
    rotation: &str,
    frames: usize,
    every: usize,
    json: bool,
) -> anyhow::Result<()> {
    let target = Transform::new(target.parse()?, rotation.parse()?);
    let mut pipeline = FilterPipeline::new(&config.tracking.filter);
    pipeline.calibrate(&Transform::ZERO);

    if !json {
        println!("Simulating {frames} frames toward position ({:.3})", target.position);
        println!("{:>6}  {:<26}  {:<26}  {:>9}", "frame", "position", "rotation", "remaining");
    }

    let every = every.max(1);
    for frame in 1..=frames {
        pipeline.advance(&target);
        if frame % every != 0 && frame != frames {
            continue;
        }
        let settled = pipeline
            .settled()
            .ok_or_else(|| anyhow::anyhow!("Filter lost its calibration"))?;
        let step = Step {
            frame,
            position: settled.position,
            rotation: settled.rotation,
            remaining: settled.position.max_abs_diff(target.position),
        };
        if json {
            println!("{}", serde_json::to_string(&step)?);
        } else {
            println!(
                "{:>6}  {:<26}  {:<26}  {:>9.5}",
                step.frame,
                format!("{:.3}", step.position),
                format!("{:.3}", step.rotation),
                step.remaining
            );
        }
    }

    Ok(())
}
