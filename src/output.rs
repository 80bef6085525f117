//! Writing finished clips to disk and rendering summaries.

use std::path::{Path, PathBuf};

use sg_core::{human_duration, SegmentWindow};
use sg_pipeline::{finalize_duration, Artifact, BatchController};

/// A clip that was written to the output directory.
#[derive(Debug, Clone)]
pub struct WrittenClip {
    pub path: PathBuf,
    pub artifact: Artifact,
}

/// Copy each artifact's bytes into `out_dir` under its file name.
pub async fn write_artifacts(
    controller: &BatchController,
    artifacts: &[Artifact],
    out_dir: &Path,
) -> sg_core::Result<Vec<WrittenClip>> {
    tokio::fs::create_dir_all(out_dir).await?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let bytes = controller
            .artifact_bytes(artifact.handle)
            .ok_or_else(|| sg_core::Error::not_found("artifact", artifact.handle))?;
        let path = out_dir.join(&artifact.filename);
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(path = %path.display(), size_bytes = artifact.size_bytes, "Wrote clip");
        written.push(WrittenClip {
            path,
            artifact: artifact.clone(),
        });
    }
    Ok(written)
}

/// Binary size with one decimal: `512 B`, `1.2 MiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `short_01.mp4  0:00 → 0:15  1.2 MiB`
pub fn summary_line(artifact: &Artifact) -> String {
    format!(
        "{}  {} → {}  {}",
        artifact.filename,
        human_duration(artifact.start_secs),
        human_duration(artifact.start_secs + artifact.duration_secs),
        human_size(artifact.size_bytes)
    )
}

/// One line per planned window, marking the ones that would be skipped.
pub fn plan_lines(windows: &[SegmentWindow], source_duration: f64, min_segment_secs: f64) -> Vec<String> {
    let mut output_index = 0;
    windows
        .iter()
        .map(|w| {
            let dur = finalize_duration(w, source_duration);
            let head = format!("#{:<3} {:>6} +{}s", w.index, human_duration(w.start_secs), dur);
            if dur <= min_segment_secs {
                format!("{head}  skipped")
            } else {
                output_index += 1;
                format!("{head}  {}", sg_engine::args::output_filename(output_index))
            }
        })
        .collect()
}
