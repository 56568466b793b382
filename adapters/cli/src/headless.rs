use std::{thread, time::Duration};

use anyhow::Result;
use spectator_rendering::{FrameControl, Presentation, RenderingBackend, Scene};
use tracing::{debug, info};

/// Backend without a window that steps frames at a fixed interval.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HeadlessBackend {
    frame_interval: Duration,
}

impl HeadlessBackend {
    pub(crate) fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

impl RenderingBackend for HeadlessBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameControl + 'static,
    {
        let Presentation {
            window_title,
            scene,
            ..
        } = presentation;
        let mut scene = scene;
        info!(title = %window_title, "running headless");

        let mut frames: u64 = 0;
        loop {
            thread::sleep(self.frame_interval);
            frames += 1;
            let control = update_scene(self.frame_interval, &mut scene);
            debug!(
                frame = frames,
                units = scene.units.len(),
                effects = scene.effects.len(),
                "frame"
            );
            if control == FrameControl::Exit {
                break;
            }
        }

        info!(
            frames,
            columns = scene.columns,
            rows = scene.rows,
            units = scene.units.len(),
            "headless playback finished"
        );
        Ok(())
    }
}
