//! WebVTT thumbnail cue generation.

use crate::sprite::{CellRegion, SpriteLayout};

/// One thumbnail cue: `[start, end)` seconds mapped to a sprite cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub start_secs: u64,
    pub end_secs: u64,
    pub region: CellRegion,
}

/// `HH:MM:SS.000`; hours are not wrapped.
pub fn format_cue_timestamp(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}.000", hours, minutes, seconds)
}

/// One cue per frame; cue `i` covers `[i*interval, (i+1)*interval)`.
pub fn build_cues(layout: &SpriteLayout, interval_secs: u32) -> Vec<Cue> {
    let interval = u64::from(interval_secs);
    (0..layout.frame_count)
        .map(|i| Cue {
            start_secs: i as u64 * interval,
            end_secs: (i as u64 + 1) * interval,
            region: layout.cell(i),
        })
        .collect()
}

/// Render the cue file body; `sprite_ref` is what players resolve the image by.
pub fn render_cue_file(cues: &[Cue], sprite_ref: &str) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
        let r = cue.region;
        out.push_str(&format!(
            "{} --> {}\n{}#xywh={},{},{},{}\n\n",
            format_cue_timestamp(cue.start_secs),
            format_cue_timestamp(cue.end_secs),
            sprite_ref,
            r.x,
            r.y,
            r.width,
            r.height
        ));
    }
    out
}
