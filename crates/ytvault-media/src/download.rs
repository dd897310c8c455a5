//! Video download using yt-dlp.
//!
//! The engine is a blocking call: it spawns `yt-dlp`, reads its output line
//! by line and hands structured telemetry to a caller-supplied hook. Progress
//! lines and the final "after move" line are requested through yt-dlp's
//! templating so no human-oriented output has to be scraped.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use ytvault_models::DownloadFormat;

use crate::error::{MediaError, MediaResult};

const PROGRESS_MARKER: &str = "[ytvault:progress]";
const DONE_MARKER: &str = "[ytvault:done]";
/// ASCII unit separator; never appears in titles or paths yt-dlp prints.
const FIELD_SEP: char = '\u{1f}';
/// yt-dlp prints this for fields that are not available.
const MISSING: &str = "NA";
/// Non-telemetry lines kept for error reporting.
const DIAGNOSTIC_LINES: usize = 20;

const PROGRESS_FIELDS: [&str; 13] = [
    "progress.status",
    "progress._percent_str",
    "progress._downloaded_bytes_str",
    "progress._total_bytes_str",
    "progress._eta_str",
    "progress._speed_str",
    "progress.filename",
    "progress.tmpfilename",
    "info.thumbnails.-1.filepath",
    "info.id",
    "info.fulltitle",
    "info.duration_string",
    "info.resolution",
];

const DONE_FIELDS: [&str; 6] = [
    "filepath",
    "thumbnails.-1.filepath",
    "id",
    "fulltitle",
    "duration_string",
    "resolution",
];

/// Tunables passed through to yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Whole-request retries
    pub retries: u32,
    /// Per-fragment retries
    pub fragment_retries: u32,
    /// Fragments fetched in parallel
    pub concurrent_fragments: u32,
    /// Container for merged audio+video output
    pub merge_output_format: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            fragment_retries: 5,
            concurrent_fragments: 5,
            merge_output_format: "mp4".to_string(),
        }
    }
}

/// One engine invocation.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub url: String,
    pub download_dir: PathBuf,
    pub format: DownloadFormat,
    pub audio_only: bool,
    pub options: EngineOptions,
}

impl EngineRequest {
    pub fn new(url: impl Into<String>, download_dir: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            download_dir: download_dir.as_ref().to_path_buf(),
            format: DownloadFormat::Best,
            audio_only: false,
            options: EngineOptions::default(),
        }
    }

    pub fn with_format(mut self, format: DownloadFormat, audio_only: bool) -> Self {
        self.format = format;
        self.audio_only = audio_only;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// yt-dlp format selector for this request.
    pub fn format_selector(&self) -> &'static str {
        if self.audio_only {
            return "bestaudio/best";
        }
        match self.format {
            DownloadFormat::Best => "bestvideo*+bestaudio/best",
            DownloadFormat::Worst => "worstvideo*+worstaudio/worst",
            DownloadFormat::AudioOnly => "bestaudio/best",
        }
    }

    /// Output path template, e.g. `downloads/1080p_Youtube___Title___id.mp4`.
    pub fn output_template(&self) -> PathBuf {
        self.download_dir
            .join("%(height)sp_%(extractor_key)s___%(title).50s___%(id)s.%(ext)s")
    }
}

/// Kind of telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryStatus {
    #[default]
    Downloading,
    /// Final artifact is in place
    Finished,
}

/// Metadata resolved by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInfo {
    pub id: Option<String>,
    pub full_title: Option<String>,
    pub duration_string: Option<String>,
    pub resolution: Option<String>,
}

/// Unnormalized telemetry as printed by the engine.
///
/// String fields may carry terminal escape sequences and padding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTelemetry {
    pub status: TelemetryStatus,
    pub percent: Option<String>,
    pub downloaded_bytes: Option<String>,
    pub total_bytes: Option<String>,
    pub eta: Option<String>,
    pub speed: Option<String>,
    /// Target file of the current download (final path when finished)
    pub filename: Option<PathBuf>,
    /// Scratch file the engine writes to while downloading
    pub tmp_filename: Option<PathBuf>,
    /// Thumbnail written next to the video
    pub thumbnail: Option<PathBuf>,
    pub info: RawInfo,
}

impl RawTelemetry {
    /// `<filename>.part`, the partial artifact yt-dlp leaves while downloading.
    pub fn part_file(&self) -> Option<PathBuf> {
        self.filename.as_ref().map(|f| {
            let mut part = f.clone().into_os_string();
            part.push(".part");
            PathBuf::from(part)
        })
    }

    /// Turn the after-move line into the terminal event, carrying the size
    /// and speed from the last progress line.
    fn finish_from(mut self, last: Option<&RawTelemetry>) -> Self {
        self.status = TelemetryStatus::Finished;
        self.percent = Some("100%".to_string());
        if let Some(last) = last {
            self.total_bytes = last.total_bytes.clone().or_else(|| last.downloaded_bytes.clone());
            self.downloaded_bytes = self.total_bytes.clone();
            self.speed = last.speed.clone();
            if self.thumbnail.is_none() {
                self.thumbnail = last.thumbnail.clone();
            }
        }
        self
    }
}

/// Returned by the progress hook to steer the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookControl {
    Continue,
    /// Kill the download; the engine returns [`MediaError::Cancelled`]
    Abort,
}

/// A blocking download backend.
///
/// Implementations call `hook` from the calling thread for every progress
/// event, then exactly once with a [`TelemetryStatus::Finished`] event
/// describing the final artifact before returning `Ok(())`.
pub trait DownloadEngine: Send + Sync {
    fn download(
        &self,
        request: &EngineRequest,
        hook: &mut dyn FnMut(RawTelemetry) -> HookControl,
    ) -> MediaResult<()>;
}

/// [`DownloadEngine`] backed by the `yt-dlp` CLI.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary: String,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check the binary is available.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.binary).map_err(|_| MediaError::YtDlpNotFound(self.binary.clone()))
    }
}

impl DownloadEngine for YtDlpEngine {
    fn download(
        &self,
        request: &EngineRequest,
        hook: &mut dyn FnMut(RawTelemetry) -> HookControl,
    ) -> MediaResult<()> {
        self.check()?;

        let args = build_args(request);
        info!(url = %request.url, format = request.format_selector(), "Starting yt-dlp");
        debug!("Running yt-dlp: {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("yt-dlp stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("yt-dlp stderr not captured"))?;

        // Progress may land on either stream depending on yt-dlp's quiet mode.
        let (tx, rx) = mpsc::channel();
        let readers = [spawn_line_reader(stdout, tx.clone()), spawn_line_reader(stderr, tx)];

        let mut last_progress: Option<RawTelemetry> = None;
        let mut done: Option<RawTelemetry> = None;
        let mut diagnostics: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_LINES);

        for line in rx {
            match parse_line(&line) {
                EngineLine::Progress(telemetry) => {
                    last_progress = Some(telemetry.clone());
                    if hook(telemetry) == HookControl::Abort {
                        info!(url = %request.url, "Download aborted, killing yt-dlp");
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(MediaError::Cancelled);
                    }
                }
                EngineLine::Done(telemetry) => done = Some(telemetry),
                EngineLine::Other => {
                    if diagnostics.len() == DIAGNOSTIC_LINES {
                        diagnostics.pop_front();
                    }
                    diagnostics.push_back(line);
                }
            }
        }

        for reader in readers {
            if reader.join().is_err() {
                warn!("yt-dlp output reader panicked");
            }
        }

        let status = child.wait()?;
        if !status.success() {
            let reason = diagnostics
                .iter()
                .rev()
                .find(|l| l.contains("ERROR"))
                .or_else(|| diagnostics.back())
                .cloned()
                .unwrap_or_default();
            return Err(MediaError::download_failed(format!(
                "yt-dlp exited with {}: {}",
                status, reason
            )));
        }

        let finished = done
            .ok_or_else(|| MediaError::download_failed("yt-dlp did not report an output file"))?
            .finish_from(last_progress.as_ref());

        match hook(finished) {
            HookControl::Continue => Ok(()),
            HookControl::Abort => Err(MediaError::Cancelled),
        }
    }
}

/// Build the yt-dlp argument list for a request.
pub fn build_args(request: &EngineRequest) -> Vec<String> {
    let opts = &request.options;
    let mut args: Vec<String> = [
        "--newline",
        "--quiet",
        "--progress",
        "--no-simulate",
        "--no-warnings",
        "--no-playlist",
        "--restrict-filenames",
        "--continue",
        "--write-thumbnail",
        "--embed-thumbnail",
        "--embed-metadata",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.extend([
        "-f".to_string(),
        request.format_selector().to_string(),
        "--retries".to_string(),
        opts.retries.to_string(),
        "--fragment-retries".to_string(),
        opts.fragment_retries.to_string(),
        "--concurrent-fragments".to_string(),
        opts.concurrent_fragments.to_string(),
        "--merge-output-format".to_string(),
        opts.merge_output_format.clone(),
        "-o".to_string(),
        request.output_template().to_string_lossy().to_string(),
        "--progress-template".to_string(),
        format!("download:{}", template(PROGRESS_MARKER, &PROGRESS_FIELDS)),
        "--print".to_string(),
        format!("after_move:{}", template(DONE_MARKER, &DONE_FIELDS)),
        "--".to_string(),
        request.url.clone(),
    ]);

    args
}

fn template(marker: &str, fields: &[&str]) -> String {
    let mut out = String::from(marker);
    for field in fields {
        out.push(FIELD_SEP);
        out.push_str(&format!("%({})s", field));
    }
    out
}

#[derive(Debug, PartialEq)]
enum EngineLine {
    Progress(RawTelemetry),
    Done(RawTelemetry),
    Other,
}

fn parse_line(line: &str) -> EngineLine {
    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let fields = split_fields(rest);
        if fields.len() != PROGRESS_FIELDS.len() {
            return EngineLine::Other;
        }
        // Per-stream "finished" lines are superseded by the after-move line.
        if fields[0] != "downloading" {
            return EngineLine::Other;
        }
        return EngineLine::Progress(RawTelemetry {
            status: TelemetryStatus::Downloading,
            percent: value(fields[1]),
            downloaded_bytes: value(fields[2]),
            total_bytes: value(fields[3]),
            eta: value(fields[4]),
            speed: value(fields[5]),
            filename: value(fields[6]).map(PathBuf::from),
            tmp_filename: value(fields[7]).map(PathBuf::from),
            thumbnail: value(fields[8]).map(PathBuf::from),
            info: RawInfo {
                id: value(fields[9]),
                full_title: value(fields[10]),
                duration_string: value(fields[11]),
                resolution: value(fields[12]),
            },
        });
    }

    if let Some(rest) = line.strip_prefix(DONE_MARKER) {
        let fields = split_fields(rest);
        if fields.len() != DONE_FIELDS.len() {
            return EngineLine::Other;
        }
        return EngineLine::Done(RawTelemetry {
            status: TelemetryStatus::Finished,
            filename: value(fields[0]).map(PathBuf::from),
            thumbnail: value(fields[1]).map(PathBuf::from),
            info: RawInfo {
                id: value(fields[2]),
                full_title: value(fields[3]),
                duration_string: value(fields[4]),
                resolution: value(fields[5]),
            },
            ..Default::default()
        });
    }

    EngineLine::Other
}

fn split_fields(rest: &str) -> Vec<&str> {
    match rest.strip_prefix(FIELD_SEP) {
        Some(body) => body.split(FIELD_SEP).collect(),
        None => Vec::new(),
    }
}

fn value(raw: &str) -> Option<String> {
    if raw.is_empty() || raw == MISSING {
        None
    } else {
        Some(raw.to_string())
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    source: R,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(source);
        for chunk in reader.split(b'\n') {
            let Ok(bytes) = chunk else { break };
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches('\r');
            if tx.send(line.to_string()).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_line(fields: &[&str]) -> String {
        let mut line = PROGRESS_MARKER.to_string();
        for f in fields {
            line.push(FIELD_SEP);
            line.push_str(f);
        }
        line
    }

    fn done_line(fields: &[&str]) -> String {
        let mut line = DONE_MARKER.to_string();
        for f in fields {
            line.push(FIELD_SEP);
            line.push_str(f);
        }
        line
    }

    const DOWNLOADING: [&str; 13] = [
        "downloading",
        "\x1b[0;94m 42.0%\x1b[0m",
        "10.00MiB",
        "23.80MiB",
        "00:07",
        "2.01MiB/s",
        "/dl/720p_Youtube___Clip___abc.f22.mp4",
        "/dl/720p_Youtube___Clip___abc.f22.mp4.part",
        "NA",
        "abc",
        "Clip",
        "3:05",
        "1280x720",
    ];

    #[test]
    fn test_parse_progress_line() {
        match parse_line(&progress_line(&DOWNLOADING)) {
            EngineLine::Progress(t) => {
                assert_eq!(t.status, TelemetryStatus::Downloading);
                assert_eq!(t.percent.as_deref(), Some("\x1b[0;94m 42.0%\x1b[0m"));
                assert_eq!(t.total_bytes.as_deref(), Some("23.80MiB"));
                assert!(t.thumbnail.is_none(), "NA maps to None");
                assert_eq!(t.info.id.as_deref(), Some("abc"));
                assert_eq!(
                    t.part_file().unwrap(),
                    PathBuf::from("/dl/720p_Youtube___Clip___abc.f22.mp4.part")
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stream_finished_lines_are_ignored() {
        let mut fields = DOWNLOADING;
        fields[0] = "finished";
        assert_eq!(parse_line(&progress_line(&fields)), EngineLine::Other);
    }

    #[test]
    fn test_malformed_and_foreign_lines() {
        assert_eq!(parse_line("[download] Destination: x.mp4"), EngineLine::Other);
        assert_eq!(parse_line(&progress_line(&["downloading", "1%"])), EngineLine::Other);
        assert_eq!(parse_line(""), EngineLine::Other);
    }

    #[test]
    fn test_parse_done_line_and_finish() {
        let line = done_line(&[
            "/dl/720p_Youtube___Clip___abc.mp4",
            "/dl/720p_Youtube___Clip___abc.webp",
            "abc",
            "Clip",
            "3:05",
            "1280x720",
        ]);
        let EngineLine::Done(done) = parse_line(&line) else {
            panic!("expected done line");
        };
        let last = match parse_line(&progress_line(&DOWNLOADING)) {
            EngineLine::Progress(t) => t,
            _ => unreachable!(),
        };
        let finished = done.finish_from(Some(&last));
        assert_eq!(finished.status, TelemetryStatus::Finished);
        assert_eq!(finished.percent.as_deref(), Some("100%"));
        assert_eq!(finished.total_bytes.as_deref(), Some("23.80MiB"));
        assert_eq!(finished.downloaded_bytes.as_deref(), Some("23.80MiB"));
        assert_eq!(
            finished.filename.unwrap(),
            PathBuf::from("/dl/720p_Youtube___Clip___abc.mp4")
        );
        assert_eq!(
            finished.thumbnail.unwrap(),
            PathBuf::from("/dl/720p_Youtube___Clip___abc.webp")
        );
    }

    #[test]
    fn test_format_selectors() {
        let req = EngineRequest::new("https://example.com/v", "/dl");
        assert_eq!(req.format_selector(), "bestvideo*+bestaudio/best");
        let worst = req.clone().with_format(DownloadFormat::Worst, false);
        assert_eq!(worst.format_selector(), "worstvideo*+worstaudio/worst");
        let audio = req.with_format(DownloadFormat::Best, true);
        assert_eq!(audio.format_selector(), "bestaudio/best");
    }

    #[test]
    fn test_build_args() {
        let req = EngineRequest::new("https://example.com/v", "/dl");
        let args = build_args(&req);

        let at = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[at("--retries") + 1], "3");
        assert_eq!(args[at("--fragment-retries") + 1], "5");
        assert_eq!(args[at("--concurrent-fragments") + 1], "5");
        assert_eq!(args[at("--merge-output-format") + 1], "mp4");
        assert!(args.contains(&"--continue".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"--embed-metadata".to_string()));
        assert!(args[at("-o") + 1].starts_with("/dl/%(height)sp_"));
        assert!(args[at("--progress-template") + 1].starts_with("download:[ytvault:progress]"));
        assert!(args[at("--print") + 1].starts_with("after_move:[ytvault:done]"));
        assert_eq!(args.last().unwrap(), "https://example.com/v");
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_against_scripted_binary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-yt-dlp");
        let mut second = DOWNLOADING;
        second[1] = "100.0%";
        let lines = [
            "[info] abc: Downloading webpage".to_string(),
            progress_line(&DOWNLOADING),
            progress_line(&second),
            done_line(&["/dl/abc.mp4", "NA", "abc", "Clip", "3:05", "1280x720"]),
        ];
        let mut body = String::from("#!/bin/sh\n");
        for line in &lines {
            body.push_str(&format!("printf '%s\\n' '{}'\n", line));
        }
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = YtDlpEngine::new(script.to_string_lossy().to_string());
        let req = EngineRequest::new("https://example.com/v", dir.path());

        let mut seen = Vec::new();
        engine
            .download(&req, &mut |t| {
                seen.push(t.status);
                HookControl::Continue
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                TelemetryStatus::Downloading,
                TelemetryStatus::Downloading,
                TelemetryStatus::Finished
            ]
        );

        let mut calls = 0;
        let err = engine
            .download(&req, &mut |_| {
                calls += 1;
                HookControl::Abort
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls, 1);
    }
}
