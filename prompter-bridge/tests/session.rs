//! Full dashboard ↔ stage sessions over the in-process transport

use prompter_bridge::loader::sanitize;
use prompter_bridge::{
    ChannelTransport, ControlSurface, DocumentLoader, Key, LoadError, MockWindowHost,
    PrompterConfig, SurfaceStatus, WindowKind,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn session() -> (Arc<MockWindowHost>, ControlSurface<ChannelTransport>) {
    let config = PrompterConfig::default();
    let host = Arc::new(MockWindowHost::new(config.displays.clone()));
    let transport = ChannelTransport::new(host.clone(), &config);
    let surface = ControlSurface::new(transport, DocumentLoader::new(config.max_file_bytes));
    (host, surface)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn long_script() -> String {
    (0..500)
        .map(|i| format!("Paragraph {} of tonight's broadcast.", i))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn stage_close_and_reopen_keeps_replica() {
    let (host, mut surface) = session();
    assert_eq!(surface.open_stage().unwrap(), SurfaceStatus::Created);

    surface.set_text("Keep me");
    surface.set_font_size(60);
    surface.set_colors("#ffcc00", "navy").unwrap();

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.replica.read().font_size == 60));

    surface.close_stage().unwrap();
    assert!(!surface.is_stage_visible());

    assert_eq!(surface.open_stage().unwrap(), SurfaceStatus::Restored);
    let replica = shared.replica.read();
    assert_eq!(replica.text, "Keep me");
    assert_eq!(replica.font_size, 60);
    assert_eq!(replica.color, "#ffcc00");
    assert_eq!(replica.bg_color, "navy");
    assert_eq!(host.windows_of_kind(WindowKind::Stage).len(), 1);

    surface.shutdown();
    assert!(host.windows_of_kind(WindowKind::Stage).is_empty());
}

#[test]
fn updates_before_the_stage_exists_are_dropped_then_resynced() {
    let (_host, mut surface) = session();
    surface.set_text("Written before the stage opened");
    surface.set_speed(120.0);

    surface.open_stage().unwrap();
    let shared = surface.transport().shared();
    assert!(wait_until(|| {
        let replica = shared.replica.read();
        replica.text == "Written before the stage opened" && replica.speed == 120.0
    }));
    // resync frame is the first one the stage ever applied
    assert_eq!(shared.status.read().rejected_frames, 0);
}

#[test]
fn speed_change_while_playing_keeps_position() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text(long_script());
    surface.set_speed(60.0);
    surface.toggle_play();

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.scroll.read().offset >= 12.0));
    let before = shared.scroll.read().offset;

    surface.set_speed(200.0);
    assert!(wait_until(|| shared.replica.read().speed == 200.0));
    assert!(shared.scroll.read().offset >= before);

    let at_switch = shared.scroll.read().offset;
    assert!(wait_until(|| shared.scroll.read().offset >= at_switch + 40.0));

    // position reports reach the dashboard
    assert!(wait_until(|| {
        surface.poll_control();
        surface.state().position > 0.0
    }));
    assert!(surface.state().is_playing);
}

#[test]
fn stage_keys_drive_the_dashboard() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    let keys = surface.transport().stage_keys().unwrap();

    keys.send(Key::Space).unwrap();
    assert!(wait_until(|| {
        surface.poll_control();
        surface.state().is_playing
    }));

    keys.send(Key::ArrowDown).unwrap();
    assert!(wait_until(|| {
        surface.poll_control();
        surface.state().speed == 50.0
    }));

    // escape is handled by the stage window itself
    keys.send(Key::F11).unwrap();
    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.status.read().fullscreen));
    keys.send(Key::Escape).unwrap();
    assert!(wait_until(|| !shared.status.read().fullscreen));
    surface.poll_control();
    assert_eq!(surface.state().speed, 50.0);
}

#[test]
fn reset_returns_to_top_and_pauses() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text(long_script());
    surface.set_speed(200.0);
    surface.toggle_play();

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.scroll.read().offset > 20.0));

    surface.reset_position();
    assert!(!surface.state().is_playing);
    assert_eq!(surface.state().position, 0.0);
    assert!(wait_until(|| {
        !shared.replica.read().is_playing && shared.scroll.read().offset == 0.0
    }));

    // stays at the top while paused
    thread::sleep(Duration::from_millis(100));
    assert_eq!(shared.scroll.read().offset, 0.0);

    surface.seek(0.0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(shared.scroll.read().offset, 0.0);
    assert!(!shared.replica.read().is_playing);
}

#[test]
fn reports_sent_before_a_reset_do_not_move_the_dashboard() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text(long_script());
    surface.set_speed(200.0);
    surface.toggle_play();

    // reports pile up unread while the stage scrolls
    thread::sleep(Duration::from_millis(450));
    surface.reset_position();

    let shared = surface.transport().shared();
    assert!(wait_until(|| {
        !shared.replica.read().is_playing && shared.scroll.read().offset == 0.0
    }));
    thread::sleep(Duration::from_millis(300));

    surface.poll_control();
    assert_eq!(surface.state().position, 0.0);
    assert_eq!(shared.scroll.read().offset, 0.0);
    assert!(!surface.state().is_playing);
}

#[test]
fn seek_past_the_end_is_corrected_by_the_stage() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text("short");
    surface.seek(99_999.0);

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.replica.read().text == "short"));
    let max = shared.scroll.read().max_scroll;
    assert_eq!(max, PrompterConfig::default().scroll_margin_px);

    assert!(wait_until(|| {
        surface.poll_control();
        surface.state().position == max
    }));
    assert_eq!(shared.scroll.read().offset, max);
}

#[test]
fn shrinking_the_script_pulls_the_dashboard_position_back() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text(long_script());
    surface.seek(750.0);

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.scroll.read().offset == 750.0));
    surface.poll_control();
    assert_eq!(surface.state().position, 750.0);

    surface.set_text("tiny");
    assert!(wait_until(|| shared.replica.read().text == "tiny"));
    assert!(wait_until(|| {
        surface.poll_control();
        let max = shared.scroll.read().max_scroll;
        surface.state().position == max && max < 750.0
    }));
    assert_eq!(shared.scroll.read().offset, shared.scroll.read().max_scroll);
}

#[test]
fn manual_seek_moves_the_stage() {
    let (host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.set_text(long_script());
    surface.seek(750.0);

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.scroll.read().offset == 750.0));

    let window = surface.transport().stage_window().unwrap();
    assert!(wait_until(|| {
        host.window(window)
            .and_then(|w| w.last_frame)
            .is_some_and(|frame| frame.scroll_offset == 750.0)
    }));
}

#[test]
fn loading_a_50kb_text_file() {
    let (_host, mut surface) = session();
    surface.open_stage().unwrap();
    surface.seek(300.0);
    let position = surface.state().position;

    let line = "The quick brown fox jumps over the lazy dog & friends.\n";
    let contents = line.repeat(50 * 1024 / line.len());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.txt");
    std::fs::write(&path, &contents).unwrap();

    let document = surface.load_path(&path).unwrap();
    assert_eq!(document.content, sanitize(&contents));
    assert_eq!(surface.state().text, sanitize(&contents));
    assert_eq!(surface.state().position, position);

    let shared = surface.transport().shared();
    assert!(wait_until(|| shared.replica.read().text == surface.state().text));
}

#[test]
fn oversize_file_is_rejected_without_touching_state() {
    let (_host, mut surface) = session();
    surface.set_text("Original script");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.txt");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(11 * 1024 * 1024).unwrap();

    assert!(matches!(
        surface.load_path(&path),
        Err(LoadError::OversizeFile { .. })
    ));
    assert_eq!(surface.state().text, "Original script");

    assert!(matches!(
        surface.load_file("notes.rtf", b"{\\rtf1}"),
        Err(LoadError::UnsupportedExtension(_))
    ));
    assert_eq!(surface.state().text, "Original script");
}
