// ============================================================
// Layer 6 — Frame Capture
// ============================================================
// During training the validation predictions are rendered as a
// grid image every evaluation step. Played back in order the
// frames show the glyphs converging towards the target style.
//
//   frame_dir/
//     step_0010.png
//     step_0020.png
//     ...
//     transition.gif   ← all frames, 0.1 s each, looping

use anyhow::{Context, Result};
use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, Frame,
};
use ndarray::ArrayView3;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use crate::infra::render::render_fonts_image;

/// File name of the compiled animation inside the frame dir
pub const GIF_NAME: &str = "transition.gif";

const FRAME_DELAY_MS: u32 = 100;
const GLYPHS_PER_ROW: usize = 10;

pub struct FrameRecorder {
    dir:    PathBuf,
    frames: Vec<(usize, PathBuf)>,
}

impl FrameRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), frames: Vec::new() }
    }

    /// Render `bitmaps` ([0, 1] intensities) as the frame for `step`.
    pub fn capture(&mut self, step: usize, bitmaps: ArrayView3<f32>) -> Result<PathBuf> {
        let path = self.dir.join(format!("step_{step:04}.png"));
        render_fonts_image(bitmaps, &path, GLYPHS_PER_ROW, true)?;
        self.frames.push((step, path.clone()));
        Ok(path)
    }

    /// Captured frame paths in step order
    pub fn frames(&self) -> Vec<&Path> {
        let mut frames: Vec<&(usize, PathBuf)> = self.frames.iter().collect();
        frames.sort_by_key(|(step, _)| *step);
        frames.into_iter().map(|(_, p)| p.as_path()).collect()
    }

    /// Compile every captured frame into `frame_dir/transition.gif`.
    /// Returns `None` when no frame was captured.
    pub fn compile_gif(&self) -> Result<Option<PathBuf>> {
        let frames = self.frames();
        if frames.is_empty() {
            tracing::warn!("No frames captured in '{}', skipping gif", self.dir.display());
            return Ok(None);
        }
        let gif = self.dir.join(GIF_NAME);
        compile_frames_to_gif(&frames, &gif)?;
        Ok(Some(gif))
    }
}

/// Stitch PNG frames into a looping GIF with a fixed per-frame delay.
pub fn compile_frames_to_gif(frames: &[&Path], gif_path: &Path) -> Result<()> {
    let file = File::create(gif_path)
        .with_context(|| format!("Cannot create '{}'", gif_path.display()))?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;

    for path in frames {
        let rgba = image::open(path)
            .with_context(|| format!("Cannot read frame '{}'", path.display()))?
            .to_rgba8();
        let delay = Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1);
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
    }

    tracing::debug!("Compiled {} frames into '{}'", frames.len(), gif_path.display());
    Ok(())
}
