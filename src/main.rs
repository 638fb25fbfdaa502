// What you SEE:
// • Live camera is the base image, the historic photo floats on top.
// • Left-drag moves the photo. Right-drag pinches/rotates it around its center.
// • Up/Down fade it, +/- scale, [ ] rotate, R resets, X removes, L (re)loads.
// • Space takes a picture into the output folder. Tab switches camera. ESC quits.

mod camera;
mod draw;
mod hud;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use historic_overlay::config::{AppConfig, ResolutionPreset};
use historic_overlay::frame_loop::FpsCounter;
use historic_overlay::logging::init_logging;
use historic_overlay::{FrameBuffer, GestureMode, ImageFile, LiveFrame, NoticeLevel, Notification, Session, TouchInput};

use camera::{CameraCapture, FrameFailures};
use draw::{Action, Drawer, MouseTouch, draw_crosshair};
use hud::{Hud, status_line};

const OPACITY_STEP: f64 = 5.0;
const SCALE_STEP: f64 = 5.0;
const ROTATION_STEP: f64 = 1.0;

#[derive(Parser)]
#[command(
    name = "historic-overlay",
    about = "Line up a historic photo over the live camera and capture the recreation",
    version
)]
struct Cli {
    /// Config file (JSON); missing file means defaults
    #[arg(short, long, default_value = "historic-overlay.json")]
    config: PathBuf,

    /// Historic photo to overlay
    #[arg(short, long)]
    overlay: Option<PathBuf>,

    /// Zero-based camera index
    #[arg(long)]
    camera: Option<u32>,

    /// Requested camera resolution: 720p, 1080p or 4k
    #[arg(long, value_parser = parse_preset)]
    resolution: Option<ResolutionPreset>,

    /// Where captures are written
    #[arg(long)]
    output: Option<PathBuf>,

    /// Initial overlay opacity (0-100)
    #[arg(long)]
    opacity: Option<f64>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_preset(s: &str) -> Result<ResolutionPreset, String> {
    ResolutionPreset::parse(s).ok_or_else(|| format!("unknown resolution {s:?} (use 720p, 1080p or 4k)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config);
    if let Some(path) = cli.overlay {
        config.overlay.path = Some(path);
    }
    if let Some(index) = cli.camera {
        config.camera.index = index;
    }
    if let Some(preset) = cli.resolution {
        config.camera.resolution = preset;
    }
    if let Some(dir) = cli.output {
        config.capture.output_dir = dir;
    }
    if let Some(opacity) = cli.opacity {
        config.overlay.opacity_percent = opacity;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging);
    config.validate().context("invalid configuration")?;

    if cli.write_config {
        config
            .save(&cli.config)
            .with_context(|| format!("writing {}", cli.config.display()))?;
        info!(path = %cli.config.display(), "config written");
        return Ok(());
    }
    run(&config)
}

fn run(config: &AppConfig) -> anyhow::Result<()> {
    /* --- Camera + window ---
       Visual: window opens with the live camera feed. */
    let cam_cfg = &config.camera;
    let mut cam = CameraCapture::open_with_fallback(cam_cfg.index, cam_cfg.resolution, cam_cfg.fps)
        .context("no usable camera")?;
    let (w, h) = cam.resolution();
    let mut drawer = Drawer::new("Historic Overlay", w as usize, h as usize)
        .context("could not open window")?;

    /* --- Session ---
       Visual: nothing on top of the video until a photo finishes loading. */
    let input = TouchInput::new();
    let mut session = Session::new(config.session_options());
    session.attach_input(&input);

    let mut hud = Hud::new();
    if let Some(path) = &config.overlay.path {
        load_overlay(&mut session, &mut hud, path);
    }

    let mut mouse = MouseTouch::new();
    let mut fps = FpsCounter::default();
    let mut failures = FrameFailures::new();
    let mut last_screen: Option<FrameBuffer> = None;
    let mut lost_camera = None;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() {
        let now = Instant::now();

        // 1) Fresh frame. A dropped frame is skipped, a dead stream ends the loop.
        let frame = match cam.next_frame() {
            Ok(f) => {
                failures.succeeded();
                f
            }
            Err(e) => {
                warn!(streak = failures.streak() + 1, "{e}");
                if failures.failed() {
                    lost_camera = Some(e);
                    break;
                }
                // keep window events and background work moving meanwhile
                session.tick(&LiveFrame::waiting(cam.resolution()));
                match &last_screen {
                    Some(screen) => drawer.present(screen)?,
                    None => drawer.pump(),
                }
                continue;
            }
        };
        let (fw, fh) = (frame.width, frame.height);
        let video = LiveFrame::new(frame, (fw as u32, fh as u32));

        // 2) Mouse as touch; the pinned pinch finger sits on the photo's center.
        let pose = session.overlay().pose();
        let pivot = (fw as f64 / 2.0 + pose.x, fh as f64 / 2.0 + pose.y);
        if let Some(event) = mouse.update(drawer.pointer(fw, fh), pivot) {
            input.dispatch(event);
        }

        // 3) Gestures in, overlay redrawn.
        session.tick(&video);

        // 4) Keys.
        for action in drawer.actions() {
            match action {
                Action::Capture => {
                    // failures already queued as a notification
                    let _ = session.begin_capture(&video);
                }
                Action::Reset => session.reset_overlay(),
                Action::Remove => {
                    session.remove_overlay();
                    info!("overlay removed");
                }
                Action::Load => match &config.overlay.path {
                    Some(path) => load_overlay(&mut session, &mut hud, path),
                    None => hud.show(
                        Notification {
                            level: NoticeLevel::Error,
                            title: "No photo".into(),
                            message: "start with --overlay <file>".into(),
                        },
                        now,
                    ),
                },
                Action::OpacityUp | Action::OpacityDown => {
                    let step = if action == Action::OpacityUp { OPACITY_STEP } else { -OPACITY_STEP };
                    let current = session.overlay().opacity_percent() as f64;
                    session.update_opacity((current + step).clamp(0.0, 100.0));
                }
                Action::ScaleUp | Action::ScaleDown => {
                    let step = if action == Action::ScaleUp { SCALE_STEP } else { -SCALE_STEP };
                    let current = session.overlay().scale() * 100.0;
                    session.set_scale_percent(current + step);
                }
                Action::RotateLeft | Action::RotateRight => {
                    let step = if action == Action::RotateRight { ROTATION_STEP } else { -ROTATION_STEP };
                    session.set_rotation_degrees(session.overlay().rotation() + step);
                }
                Action::SwitchCamera => {
                    let (next, err) = camera::switch_camera(cam, cam_cfg.resolution, cam_cfg.fps)
                        .context("lost the camera while switching")?;
                    cam = next;
                    if let Some(e) = err {
                        hud.show(
                            Notification {
                                level: NoticeLevel::Error,
                                title: "Camera".into(),
                                message: e.to_string(),
                            },
                            now,
                        );
                    }
                }
            }
        }

        // 5) Finished captures go to disk.
        for shot in session.take_captures() {
            if let Err(e) = shot.save_to(&config.capture.output_dir) {
                error!("{e}");
                hud.show(
                    Notification { level: NoticeLevel::Error, title: "Save failed".into(), message: e.to_string() },
                    now,
                );
            }
        }
        for notice in session.drain_notifications() {
            hud.show(notice, now);
        }

        // 6) What you see: video + photo + HUD.
        let Some(mut screen) = video.frame else { continue };
        session.compose_display(&mut screen);
        if session.gesture_mode() == GestureMode::PinchingRotating {
            draw_crosshair(&mut screen, pivot.0 as i32, pivot.1 as i32, 8, 0x00FF_C040);
        }
        fps.frame(now);
        let status = status_line(session.overlay(), session.is_loading(), fps.fps());
        hud.draw(&mut screen, &status, now);

        drawer.present(&screen)?;
        last_screen = Some(screen);
    }

    // wait for in-flight encodes so a last-second capture isn't lost
    while session.captures_pending() > 0 {
        session.tick(&LiveFrame::waiting((w, h)));
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    for shot in session.take_captures() {
        shot.save_to(&config.capture.output_dir)?;
    }
    session.teardown();

    match lost_camera {
        Some(e) => Err(e).context("camera stopped delivering frames"),
        None => Ok(()),
    }
}

/// Read and start decoding a photo; problems show up on the notification line.
fn load_overlay(session: &mut Session, hud: &mut Hud, path: &Path) {
    match ImageFile::from_path(path) {
        Ok(file) => {
            info!(path = %path.display(), bytes = file.size, "loading overlay");
            // validation errors are queued by the session
            let _ = session.load_image(file);
        }
        Err(e) => {
            warn!("{e}");
            hud.show(
                Notification { level: NoticeLevel::Error, title: "Error loading image".into(), message: e.to_string() },
                Instant::now(),
            );
        }
    }
}
