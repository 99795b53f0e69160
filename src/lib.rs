// songforge - theme in, song out

pub mod cli;
pub mod config;
pub mod generator;
pub mod render;

use std::process::ExitCode;

use tracing::{error, info};

use cli::{Cli, Command, VisualizeArgs};
use config::{AppConfig, ConfigError};
use generator::{
    build_http_client, AnthropicLyricsWriter, Downloader, GenerationError, MusicClient,
    Orchestrator, PipelineReport, RetryPolicy, TaskStore, VideoOutcome,
};
use render::render_visualization;

/// Exit status for a configuration or usage problem
const EXIT_CONFIG: u8 = 2;
/// Exit status for a failed chain, exhaustion or missing task id
const EXIT_FAILURE: u8 = 1;

/// Run one invocation and map the result to a process exit code
pub async fn run(cli: Cli) -> ExitCode {
    if let Some(Command::Visualize(args)) = &cli.command {
        return visualize(args).await;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("[Config] {}", e);
            if matches!(e, ConfigError::MissingKey("ANTHROPIC_API_KEY")) {
                eprintln!("Add ANTHROPIC_API_KEY to your .env file or use --instrumental.");
            }
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let orchestrator = match build_orchestrator(&cli, config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return report_failure(&e),
    };

    if let Some(task_id) = cli.check_mp4_task.clone() {
        let output = cli.resume_video_output();
        return match orchestrator.resume_video(task_id, &output).await {
            Ok(result) => {
                println!("\n✓ MP4 saved to {} ({} bytes)", result.path.display(), result.bytes);
                ExitCode::SUCCESS
            }
            Err(e) => report_failure(&e),
        };
    }

    let outcome = if let Some(task_id) = cli.check_task.clone() {
        let video = cli.video_request();
        orchestrator
            .resume_audio(task_id, &cli.output, video.as_ref())
            .await
    } else {
        let Some(theme) = cli.theme.clone().filter(|t| !t.trim().is_empty()) else {
            error!("[Config] Please provide a theme with --theme");
            return ExitCode::from(EXIT_CONFIG);
        };
        orchestrator.run(cli.song_request(theme)).await
    };

    match outcome {
        Ok(report) => {
            info!("[Songforge] ✓ Chain complete for task {}", report.audio_job.task_id);
            for line in summary_lines(&report) {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

/// Environment plus command-line overrides; lyrics credentials only when needed
fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let config = AppConfig::from_env()?.with_proxy(cli.proxy.clone())?;
    if cli.needs_lyrics() && config.anthropic_key.is_none() {
        return Err(ConfigError::MissingKey("ANTHROPIC_API_KEY"));
    }
    Ok(config)
}

fn build_orchestrator(cli: &Cli, config: AppConfig) -> Result<Orchestrator, GenerationError> {
    let api_http = build_http_client(&config.network, Some(config.network.timeout))?;
    let download_http = build_http_client(&config.network, None)?;

    let music = MusicClient::new(api_http.clone(), config.music_key, config.music);
    let downloader = Downloader::new(download_http, RetryPolicy::default());
    let store = TaskStore::new(&cli.state_dir);

    let mut orchestrator =
        Orchestrator::new(music, downloader, store).with_poll_settings(cli.poll_settings());
    if let Some(key) = config.anthropic_key {
        orchestrator = orchestrator
            .with_lyrics_writer(Box::new(AnthropicLyricsWriter::new(api_http, key, config.lyrics)));
    }
    Ok(orchestrator)
}

async fn visualize(args: &VisualizeArgs) -> ExitCode {
    let request = args.render_request();
    match render_visualization(&request).await {
        Ok(path) => {
            println!("✓ Visualisation saved to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

fn report_failure(e: &GenerationError) -> ExitCode {
    error!("✗ {}", e);
    if let Some(hint) = e.hint() {
        eprintln!("{}", hint);
    }
    ExitCode::from(EXIT_FAILURE)
}

/// Human-readable result of a completed chain
pub fn summary_lines(report: &PipelineReport) -> Vec<String> {
    let mut lines = vec![String::new(), "=".repeat(40)];
    if let Some(title) = &report.title {
        lines.push(format!("Title: {}", title));
    }
    lines.push(format!("Task ID: {}", report.audio_job.task_id));
    lines.push(format!(
        "✓ Audio saved to {} ({} bytes, {} attempt(s))",
        report.audio.path.display(),
        report.audio.bytes,
        report.audio.attempts
    ));

    match &report.video {
        None => {}
        Some(VideoOutcome::Downloaded(result)) => {
            lines.push(format!("✓ MP4 saved to {}", result.path.display()));
        }
        Some(VideoOutcome::Rendered { path, mode, cause }) => {
            lines.push(format!(
                "✓ MP4 rendered locally ({}) to {} after provider export failed: {}",
                mode,
                path.display(),
                cause
            ));
        }
        Some(VideoOutcome::Failed(e)) => {
            lines.push(format!("✗ MP4 export failed: {}", e));
            lines.push("  The audio file above is still complete.".to_string());
        }
        Some(VideoOutcome::Skipped) => {
            lines.push("✗ MP4 export skipped: no audio id in the provider response".to_string());
        }
    }
    lines.push("=".repeat(40));
    lines
}
