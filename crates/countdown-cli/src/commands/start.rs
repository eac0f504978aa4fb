use std::cell::RefCell;
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Args;
use countdown_core::audio::{beep_sink, default_backend};
use countdown_core::duration::render_clock;
use countdown_core::timer::SinkResult;
use countdown_core::{
    seconds_to_phrase, CommandSpeaker, CompletionWorkflow, CountdownEngine, EntryMode,
    MelodyPlayer, QuitSignal, SettingsStore, SpeechHandle, SpeechQueue, TargetDuration,
    TimerConfiguration,
};
#[cfg(not(target_os = "linux"))]
use countdown_core::TtsSpeaker;
use tokio::task::LocalSet;

use super::open_settings;

#[cfg(target_os = "linux")]
const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng -v ru";

#[derive(Args)]
pub struct StartArgs {
    /// Duration as hours and minutes, e.g. 1:30
    #[arg(long, value_name = "H:MM", conflicts_with = "ms")]
    hm: Option<String>,
    /// Duration as minutes and seconds, e.g. 05:00
    #[arg(long, value_name = "MM:SS")]
    ms: Option<String>,
    /// Print one JSON object per tick instead of the clock
    #[arg(long)]
    json: bool,
    /// Disable voice announcements
    #[arg(long)]
    mute: bool,
    /// Speech synthesizer command; the phrase is passed as the last argument.
    /// Defaults to `espeak-ng -v ru` on Linux and the system voice elsewhere
    #[arg(long, value_name = "COMMAND")]
    speech_command: Option<String>,
}

pub fn run(args: StartArgs, settings: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let mut store = open_settings(settings)?;
    let target = resolve_target(&args, &store)?;
    if let Err(e) = store.remember_entry(&target) {
        tracing::warn!(error = %e, "cannot remember entered time");
    }
    let config = store.timer_configuration();

    let mut speech = if args.mute {
        None
    } else {
        Some(start_speech(args.speech_command.as_deref())?)
    };

    if !args.json {
        let finishes = target.finishes_at(chrono::Local::now());
        println!(
            "Countdown {}, finishes at {}",
            target.render(target.total_seconds()),
            finishes.format("%H:%M:%S")
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = LocalSet::new();
    let result = local.block_on(
        &runtime,
        countdown(
            target,
            config,
            speech.as_ref().map(SpeechQueue::handle),
            args.json,
        ),
    );

    if let Some(queue) = speech.as_mut() {
        queue.shutdown();
    }
    result
}

fn resolve_target(args: &StartArgs, store: &SettingsStore) -> Result<TargetDuration, Box<dyn Error>> {
    if let Some(hm) = &args.hm {
        return Ok(TargetDuration::parse(EntryMode::HourMinute, hm)?);
    }
    if let Some(ms) = &args.ms {
        return Ok(TargetDuration::parse(EntryMode::MinuteSecond, ms)?);
    }
    store
        .restored_entry()
        .ok_or_else(|| "no duration given: pass --hm H:MM or --ms MM:SS, or set restore_time".into())
}

fn start_speech(command: Option<&str>) -> Result<SpeechQueue, Box<dyn Error>> {
    match command {
        Some(command) => start_command_speech(command),
        None => start_default_speech(),
    }
}

#[cfg(target_os = "linux")]
fn start_default_speech() -> Result<SpeechQueue, Box<dyn Error>> {
    start_command_speech(DEFAULT_SPEECH_COMMAND)
}

#[cfg(not(target_os = "linux"))]
fn start_default_speech() -> Result<SpeechQueue, Box<dyn Error>> {
    Ok(SpeechQueue::spawn_with(TtsSpeaker::new)?)
}

fn start_command_speech(command: &str) -> Result<SpeechQueue, Box<dyn Error>> {
    let mut words =
        shlex::split(command).ok_or_else(|| format!("cannot parse speech command '{command}'"))?;
    if words.is_empty() {
        return Err("speech command is empty".into());
    }
    let program = words.remove(0);
    let speaker = CommandSpeaker::new(program, words);
    speaker.ensure_available()?;
    Ok(SpeechQueue::spawn(speaker)?)
}

async fn countdown(
    target: TargetDuration,
    config: TimerConfiguration,
    speech: Option<SpeechHandle>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let quit = QuitSignal::new();
    let backend = default_backend();
    let failure: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let mut engine = CountdownEngine::new(config.clone());

    let mode = target.mode();
    engine.register_display_sink(move |seconds| show(mode, seconds, json));
    if let Some(speech) = speech {
        engine.register_voice_sink(move |seconds| {
            speech.say(seconds_to_phrase(seconds))?;
            Ok(())
        });
    }
    engine.register_beep_sink(beep_sink(backend.clone()));

    // Melody trouble is reported but the countdown itself still succeeded.
    let workflow = CompletionWorkflow::new(
        MelodyPlayer::new(backend),
        config.completion_melody_path,
        quit.clone(),
        |title, message| eprintln!("\nwarning: {title}: {message}"),
    );
    engine.register_completion_sink(workflow.into_sink());

    let fatal = failure.clone();
    let halt = quit.clone();
    engine.register_fatal_channel(move |title, message| {
        *fatal.borrow_mut() = Some(format!("{title}: {message}"));
        halt.quit_with_failure();
    });

    engine.start(target.total_seconds())?;

    tokio::select! {
        phase = engine.run() => tracing::debug!(?phase, "countdown loop finished"),
        Ok(()) = tokio::signal::ctrl_c() => {
            quit.quit();
        }
    }
    tokio::select! {
        () = quit.wait() => {}
        Ok(()) = tokio::signal::ctrl_c() => {
            quit.quit();
        }
    }
    if !json {
        println!();
    }

    let failure = failure.borrow_mut().take();
    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn show(mode: EntryMode, seconds: u64, json: bool) -> SinkResult {
    let mut out = std::io::stdout().lock();
    if json {
        let line = serde_json::json!({
            "seconds_remaining": seconds,
            "clock": render_clock(mode, seconds),
        });
        writeln!(out, "{line}")?;
    } else {
        write!(out, "\r{}", render_clock(mode, seconds))?;
    }
    out.flush()?;
    Ok(())
}
