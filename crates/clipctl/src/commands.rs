use std::io::{self, Write};

use anyhow::{Context, Result};
use clipconf::{ClipConfig, ConfigSources, QualityProfile};
use cliprec::{ClipRecord, SqliteClipIndex};

pub fn show_config(config: &ClipConfig, sources: &ConfigSources) -> Result<()> {
    let mut out = io::stdout().lock();
    if sources.files.is_empty() {
        writeln!(out, "# sources: compiled defaults")?;
    }
    for file in &sources.files {
        writeln!(out, "# file: {}", file.display())?;
    }
    for var in &sources.env_overrides {
        writeln!(out, "# env: {}", var)?;
    }
    writeln!(out)?;
    write!(out, "{}", config.to_toml())?;
    Ok(())
}

pub fn show_codec(config: &ClipConfig) -> Result<()> {
    let codec = config.codec().context("Failed to load codec profile")?;
    let quality = match codec.quality() {
        QualityProfile::NotSpecified => "not specified".to_string(),
        QualityProfile::Original => "original".to_string(),
        QualityProfile::High => "high".to_string(),
        QualityProfile::Medium => "medium".to_string(),
        QualityProfile::Low => "low".to_string(),
        QualityProfile::Other(v) => format!("other ({})", v),
    };

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "source:              {}",
        config
            .paths
            .config_dir
            .join(clipconf::CODEC_CONFIG_FILENAME)
            .display()
    )?;
    writeln!(out, "bit_rate_multiplier: {}", codec.bit_rate_multiplier)?;
    writeln!(out, "max_bit_rate:        {}", codec.max_bit_rate)?;
    writeln!(out, "gop_size:            {}", codec.gop_size)?;
    writeln!(out, "keyint_min:          {}", codec.keyint_min)?;
    writeln!(out, "preset:              {}", codec.preset)?;
    writeln!(out, "max size:            {}x{}", codec.max_width, codec.max_height)?;
    writeln!(out, "quality:             {}", quality)?;
    Ok(())
}

pub fn list_clips(config: &ClipConfig, location: Option<&str>, json: bool) -> Result<()> {
    let index = SqliteClipIndex::open(&config.paths.index_path).with_context(|| {
        format!(
            "Failed to open clip index {}",
            config.paths.index_path.display()
        )
    })?;
    let clips = index.list(location).context("Failed to list clips")?;

    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &clips)?;
        writeln!(out)?;
        return Ok(());
    }

    for line in render_rows(config, &clips) {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "{} clip(s)", clips.len())?;
    Ok(())
}

fn render_rows(config: &ClipConfig, clips: &[ClipRecord]) -> Vec<String> {
    clips
        .iter()
        .map(|clip| {
            let size = std::fs::metadata(config.paths.storage_dir.join(&clip.path))
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "missing".to_string());
            format!(
                "{:<48} {:>14} {:>14} {:>8.1}s {:>10}",
                clip.path,
                clip.start_ms,
                clip.end_ms,
                clip.duration_ms() as f64 / 1000.0,
                size
            )
        })
        .collect()
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
