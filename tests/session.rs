use std::io;
use std::thread;
use std::time::{Duration, Instant};

use serialscope::{
    ByteSource, CollectingSink, ConnectionState, ScaleMode, ScopeApp, ScopeConfig, ScopeError,
    ScriptedSource, Session, SourceOpener,
};

fn opener_for(
    script: ScriptedSource,
) -> impl Fn(&str) -> io::Result<Box<dyn ByteSource>> {
    move |_: &str| -> io::Result<Box<dyn ByteSource>> { Ok(Box::new(script.clone())) }
}

fn session_for(script: ScriptedSource) -> Session<impl SourceOpener> {
    Session::new(ScopeConfig::default(), opener_for(script)).unwrap()
}

/// Tick until `done` holds or two seconds pass.
fn tick_until<O, F>(session: &mut Session<O>, sink: &mut CollectingSink, mut done: F) -> bool
where
    O: SourceOpener,
    F: FnMut(&Session<O>) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        session.tick(sink);
        if done(session) {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn connect_detects_header_and_streams_frames() {
    let script = ScriptedSource::new().lines(["booting", "time,temp", "1,20.0", "2,21.0", "3,22.0"]);
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();

    session.connect("scripted").unwrap();
    assert_eq!(session.state(), ConnectionState::Detecting);

    assert!(tick_until(&mut session, &mut sink, |s| s.samples_seen() == 3));
    assert_eq!(session.state(), ConnectionState::Streaming);
    assert_eq!(session.selected_column(), Some("time"));
    assert_eq!(sink.schemas, vec![vec!["time".to_string(), "temp".to_string()]]);

    let frame = sink.last_frame().unwrap();
    assert_eq!(frame.points, vec![[0.0, 1.0], [1.0, 2.0], [2.0, 3.0]]);
    assert_eq!(frame.x_range, (0.0, 500.0));
}

#[test]
fn selection_and_scale_change_the_next_frame() {
    let script = ScriptedSource::new().lines(["time,temp", "1,20.0", "2,21.0"]);
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();
    assert!(tick_until(&mut session, &mut sink, |s| s.samples_seen() == 2));

    session.select_column("temp").unwrap();
    session.set_scale_mode(ScaleMode::Fixed(5.0));
    let report = session.tick(&mut sink);
    assert!(report.updated);
    let frame = sink.last_frame().unwrap();
    assert_eq!(frame.points, vec![[0.0, 20.0], [1.0, 21.0]]);
    assert_eq!(frame.y_range, (-5.0, 5.0));

    assert!(matches!(
        session.select_column("humidity"),
        Err(ScopeError::UnknownColumn(_))
    ));
    assert_eq!(session.selected_column(), Some("temp"));
}

#[test]
fn single_sample_produces_no_update() {
    let script = ScriptedSource::new().lines(["a,b", "1,2"]);
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();
    assert!(tick_until(&mut session, &mut sink, |s| s.samples_seen() == 1));
    assert!(sink.frames.is_empty());
}

#[test]
fn each_tick_folds_at_most_one_batch() {
    let mut payload = String::from("n,v\n");
    for i in 0..250 {
        payload.push_str(&format!("{i},{i}\n"));
    }
    let mut session = session_for(ScriptedSource::new().chunk(payload));
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();
    // the whole payload is one read, so it is queued well before this
    thread::sleep(Duration::from_millis(200));

    assert_eq!(session.tick(&mut sink).folded, 100);
    assert_eq!(session.tick(&mut sink).folded, 100);
    assert_eq!(session.tick(&mut sink).folded, 50);
    assert_eq!(session.samples_seen(), 250);
}

#[test]
fn clear_keeps_schema_and_connection() {
    let script = ScriptedSource::new().lines(["a,b", "1,2", "3,4", "5,6"]);
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();
    assert!(tick_until(&mut session, &mut sink, |s| s.samples_seen() == 3));

    session.clear();
    assert_eq!(session.samples_seen(), 0);
    assert!(session.window().is_empty());
    assert_eq!(session.state(), ConnectionState::Streaming);
    assert!(session.schema().is_some());
    assert!(!session.tick(&mut sink).updated);
}

#[test]
fn clear_flushes_queued_records_before_they_are_folded() {
    let mut payload = String::from("n,v\n");
    for i in 0..50 {
        payload.push_str(&format!("{i},{i}\n"));
    }
    let mut session = session_for(ScriptedSource::new().chunk(payload));
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();
    thread::sleep(Duration::from_millis(200));

    // header and records are queued but no tick has run yet
    session.clear();
    assert_eq!(session.samples_seen(), 0);
    // the queued header is still adopted
    assert_eq!(session.state(), ConnectionState::Streaming);
    assert_eq!(session.schema().unwrap().columns(), ["n", "v"]);

    let report = session.tick(&mut sink);
    assert_eq!(report.folded, 0);
    assert!(report.schema_detected);
    assert!(!report.updated);
    assert_eq!(session.samples_seen(), 0);
    assert_eq!(sink.schemas, vec![vec!["n".to_string(), "v".to_string()]]);
}

#[test]
fn clear_still_applies_a_queued_failure() {
    let script = ScriptedSource::new()
        .chunk("a,b\n1,2\n3,4\n")
        .fail("device unplugged");
    let mut session = session_for(script);
    session.connect("scripted").unwrap();
    thread::sleep(Duration::from_millis(200));

    session.clear();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.last_error().unwrap().contains("device unplugged"));
    assert_eq!(session.samples_seen(), 0);
}

#[test]
fn disconnect_and_reconnect_start_from_scratch() {
    let script = ScriptedSource::new().lines(["a,b", "1,2", "3,4"]);
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();
    session.connect("first").unwrap();
    assert!(tick_until(&mut session, &mut sink, |s| s.samples_seen() == 2));

    session.connect("second").unwrap();
    assert_eq!(session.state(), ConnectionState::Detecting);
    assert_eq!(session.address(), Some("second"));
    assert!(session.schema().is_none());
    assert_eq!(session.samples_seen(), 0);

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.schema().is_none());
    assert!(session.address().is_none());
    assert!(!session.tick(&mut sink).updated);
}

#[test]
fn open_failure_leaves_session_disconnected() {
    let opener = |_: &str| -> io::Result<Box<dyn ByteSource>> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such port"))
    };
    let mut session = Session::new(ScopeConfig::default(), opener).unwrap();
    let err = session.connect("COM9").unwrap_err();
    assert!(matches!(err, ScopeError::Transport { ref address, .. } if address == "COM9"));
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.last_error().unwrap().contains("no such port"));
}

#[test]
fn source_failure_disconnects_and_reports() {
    let script = ScriptedSource::new().lines(["a,b", "1,2"]).fail("device unplugged");
    let mut session = session_for(script);
    let mut sink = CollectingSink::default();
    session.connect("scripted").unwrap();

    assert!(tick_until(&mut session, &mut sink, |s| {
        s.state() == ConnectionState::Disconnected
    }));
    assert!(session.last_error().unwrap().contains("device unplugged"));
    assert!(session.schema().is_none());
    assert_eq!(session.samples_seen(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = ScopeConfig {
        batch_limit: 0,
        ..ScopeConfig::default()
    };
    assert!(Session::new(cfg, opener_for(ScriptedSource::new())).is_err());
}

#[test]
fn app_title_follows_detection() {
    let script = ScriptedSource::new().lines(["time,temp", "1,20.0", "2,21.0"]);
    let mut app = ScopeApp::with_opener(ScopeConfig::default(), opener_for(script)).unwrap();
    assert_eq!(app.plot_title(), "Dynamic CSV Oscilloscope - Waiting for data...");

    app.connect();
    let deadline = Instant::now() + Duration::from_secs(2);
    while app.session().samples_seen() < 2 && Instant::now() < deadline {
        app.tick();
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(app.plot_title(), "Dynamic CSV Oscilloscope - time");
    assert_eq!(app.view().columns, vec!["time".to_string(), "temp".to_string()]);
    assert_eq!(app.view().frame.points.len(), 2);

    app.disconnect();
    assert_eq!(app.session().state(), ConnectionState::Disconnected);
    assert!(app.view().frame.points.is_empty());
}
