use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use image::imageops::FilterType;
use image::GenericImageView;

use crate::composite::{open_image, CompositeError};

/// External tool names used for video decode/encode. Overridable so packaged
/// builds can point at a bundled binary.
#[derive(Debug, Clone)]
pub struct VideoToolchain {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for VideoToolchain {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct VideoStreamInfo {
    width: u32,
    height: u32,
    /// Frame rate as ffprobe reports it (`30000/1001` style), handed back to
    /// the encoder untouched to avoid rounding drift.
    fps: String,
}

/// Composites a still overlay over every frame of `base` and writes the
/// re-encoded video to `output`.
///
/// The overlay is resampled once to the frame size, not per frame. An overlay
/// without an alpha channel replaces every frame wholesale, mirroring the
/// image blend's "over" semantics. Only the visual stream is re-encoded;
/// audio is not carried over. On any failure the partial output file is
/// removed before the error is returned.
pub fn composite_video(
    base: &Path,
    overlay: &Path,
    output: &Path,
    tools: &VideoToolchain,
) -> Result<(), CompositeError> {
    let result = blend_frames(base, overlay, output, tools);
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

fn blend_frames(
    base: &Path,
    overlay: &Path,
    output: &Path,
    tools: &VideoToolchain,
) -> Result<(), CompositeError> {
    let info = probe_stream(base, tools)?;

    let overlay_img = open_image(overlay)?;
    let overlay_img = if overlay_img.dimensions() == (info.width, info.height) {
        overlay_img
    } else {
        overlay_img.resize_exact(info.width, info.height, FilterType::Lanczos3)
    };
    let overlay_rgba = overlay_img.to_rgba8();
    // Alpha-free overlays decode with alpha 255 throughout, which degrades
    // the blend to a hard replacement of each frame.
    let alpha: Vec<f32> = overlay_rgba
        .pixels()
        .map(|p| p[3] as f32 / 255.0)
        .collect();

    let mut decoder = spawn_decoder(base, tools)?;
    let mut encoder = spawn_encoder(output, &info, tools)?;

    let decoder_stdout = decoder.stdout.take().ok_or_else(|| CompositeError::ToolFailed {
        tool: tools.ffmpeg.clone(),
        code: None,
        stderr: "decoder stdout pipe unavailable".into(),
    })?;
    let encoder_stdin = encoder.stdin.take().ok_or_else(|| CompositeError::ToolFailed {
        tool: tools.ffmpeg.clone(),
        code: None,
        stderr: "encoder stdin pipe unavailable".into(),
    })?;

    let mut frames = BufReader::new(decoder_stdout);
    let mut sink = BufWriter::new(encoder_stdin);

    let frame_len = info.width as usize * info.height as usize * 3;
    let mut frame = vec![0u8; frame_len];
    loop {
        match frames.read_exact(&mut frame) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
        blend_frame(&mut frame, overlay_rgba.as_raw(), &alpha);
        sink.write_all(&frame)?;
    }

    // Closing the encoder's stdin lets it finalize the container.
    drop(sink);
    finish_child(decoder, &tools.ffmpeg)?;
    finish_child(encoder, &tools.ffmpeg)?;
    Ok(())
}

fn blend_frame(frame: &mut [u8], overlay: &[u8], alpha: &[f32]) {
    for (i, a) in alpha.iter().enumerate() {
        if *a == 0.0 {
            continue;
        }
        let over = &overlay[i * 4..i * 4 + 3];
        let under = &mut frame[i * 3..i * 3 + 3];
        for c in 0..3 {
            under[c] = (over[c] as f32 * a + under[c] as f32 * (1.0 - a)).round() as u8;
        }
    }
}

fn probe_stream(input: &Path, tools: &VideoToolchain) -> Result<VideoStreamInfo, CompositeError> {
    let output = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0",
        ])
        .arg(input)
        .output()
        .map_err(|err| tool_spawn_error(err, &tools.ffprobe))?;

    if !output.status.success() {
        return Err(CompositeError::ToolFailed {
            tool: tools.ffprobe.clone(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.trim();
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 3 {
        return Err(CompositeError::Probe(format!(
            "unexpected ffprobe output: {line}"
        )));
    }
    let width = parts[0]
        .parse()
        .map_err(|_| CompositeError::Probe(format!("bad width: {}", parts[0])))?;
    let height = parts[1]
        .parse()
        .map_err(|_| CompositeError::Probe(format!("bad height: {}", parts[1])))?;
    Ok(VideoStreamInfo {
        width,
        height,
        fps: parts[2].trim().to_string(),
    })
}

fn spawn_decoder(input: &Path, tools: &VideoToolchain) -> Result<Child, CompositeError> {
    Command::new(&tools.ffmpeg)
        .arg("-i")
        .arg(input)
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-v", "error", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| tool_spawn_error(err, &tools.ffmpeg))
}

fn spawn_encoder(
    output: &Path,
    info: &VideoStreamInfo,
    tools: &VideoToolchain,
) -> Result<Child, CompositeError> {
    Command::new(&tools.ffmpeg)
        .args(["-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
        .args(["-s", &format!("{}x{}", info.width, info.height)])
        .args(["-r", &info.fps])
        .args(["-i", "pipe:0"])
        .args(["-c:v", "libx264", "-preset", "veryfast", "-crf", "18"])
        .args(["-pix_fmt", "yuv420p", "-v", "error"])
        .arg(output)
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| tool_spawn_error(err, &tools.ffmpeg))
}

fn finish_child(mut child: Child, tool: &str) -> Result<(), CompositeError> {
    let status = child.wait()?;
    if status.success() {
        return Ok(());
    }
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    Err(CompositeError::ToolFailed {
        tool: tool.to_string(),
        code: status.code(),
        stderr: stderr.trim().to_string(),
    })
}

fn tool_spawn_error(err: std::io::Error, tool: &str) -> CompositeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CompositeError::ToolMissing {
            tool: tool.to_string(),
        }
    } else {
        CompositeError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_overlay_replaces_frame_content() {
        // 2x1 frame, overlay fully opaque red.
        let mut frame = vec![10, 20, 30, 40, 50, 60];
        let overlay = vec![255, 0, 0, 255, 255, 0, 0, 255];
        let alpha = vec![1.0, 1.0];
        blend_frame(&mut frame, &overlay, &alpha);
        assert_eq!(frame, vec![255, 0, 0, 255, 0, 0]);
    }

    #[test]
    fn transparent_overlay_pixels_leave_frame_untouched() {
        let mut frame = vec![10, 20, 30];
        let overlay = vec![255, 0, 0, 0];
        let alpha = vec![0.0];
        blend_frame(&mut frame, &overlay, &alpha);
        assert_eq!(frame, vec![10, 20, 30]);
    }

    #[test]
    fn half_alpha_meets_in_the_middle() {
        let mut frame = vec![0, 0, 0];
        let overlay = vec![255, 255, 255, 128];
        let alpha = vec![128.0 / 255.0];
        blend_frame(&mut frame, &overlay, &alpha);
        assert_eq!(frame, vec![128, 128, 128]);
    }
}
