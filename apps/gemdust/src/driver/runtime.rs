use super::*;

/// Loads `options.url` into a fresh session and drives it frame by frame.
pub(super) fn drive(options: &DriverOptions) -> Result<DriveSummary, String> {
    let (sender, events) =
        local_event_channel(MAX_EVENT_BYTES).map_err(|error| error.to_string())?;
    let context = SessionContext::new(
        Arc::new(DefaultTransports::new()),
        sender,
        Arc::new(SystemClock::new()),
    );
    let mut session = DocumentSession::with_line_layout(context, options.session_config());
    session.resize(options.width, options.height);
    session.set_url(&options.url);

    let mut summary = DriveSummary::default();
    wait_for_fetch(&mut session, &events, &mut summary)?;
    if options.scroll != 0 {
        let span = session.config().smooth_duration_ms;
        session.smooth_scroll(options.scroll, span);
    }

    let mut painter = RecordingPainter::default();
    for _ in 0..options.frames {
        let frame = session.frame(&mut painter);
        summary.frames += 1;
        summary.draw_calls += frame.draw_calls;
        collect_events(&events, &mut summary);
        tracing::trace!(draw_calls = frame.draw_calls, tiles = frame.tiles_touched, "frame");
        if !session.tick() && !session.is_requesting() {
            break;
        }
        thread::sleep(FRAME_INTERVAL);
    }

    summary.scroll_y = session.scroll_y();
    summary.visible_lines = visible_lines(&session);
    Ok(summary)
}

fn wait_for_fetch(
    session: &mut DocumentSession,
    events: &EventReceiver,
    summary: &mut DriveSummary,
) -> Result<(), String> {
    let started = Instant::now();
    while session.is_requesting() {
        if started.elapsed() > FETCH_TIMEOUT {
            session.cancel();
            return Err(format!("timed out loading `{}`", session.url()));
        }
        session.poll();
        collect_events(events, summary);
        thread::sleep(FETCH_POLL_INTERVAL);
    }
    session.poll();
    collect_events(events, summary);
    Ok(())
}

fn collect_events(events: &EventReceiver, summary: &mut DriveSummary) {
    for event in events.drain() {
        summary.events.push(format!("{}: {event:?}", event.name()));
    }
}

fn visible_lines(session: &DocumentSession) -> Vec<String> {
    let doc = session.document();
    let top = session.scroll_y();
    let range = RangeI::new(top, top + session.viewport().y);
    let mut lines = Vec::new();
    doc.enumerate_runs(range, &mut |handle, run| {
        let text = doc.run_text(handle).unwrap_or_default();
        lines.push(describe_run(run, text));
    });
    lines
}

fn describe_run(run: &Run, text: &str) -> String {
    let label = run.label.as_deref().unwrap_or(text);
    let marker = if run.link_id != 0 {
        format!("[{}]", run.link_id)
    } else if run.pre_id != 0 {
        "```".to_owned()
    } else {
        String::new()
    };
    format!("{:>5} {marker:<5} {label}", run.bounds.top())
}

pub(super) fn print_summary(options: &DriverOptions, summary: &DriveSummary) {
    println!("url:        {}", options.url);
    println!("frames:     {}", summary.frames);
    println!("draw calls: {}", summary.draw_calls);
    println!("scroll y:   {}", summary.scroll_y);
    println!("events:");
    for event in &summary.events {
        println!("  {event}");
    }
    println!("visible:");
    for line in &summary.visible_lines {
        println!("  {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::DriverOptions;
    use super::describe_run;
    use super::drive;
    use gd_core::Rect;
    use gd_document::MediaKind;
    use gd_document::Run;
    use gd_document::RunFlags;

    #[test]
    fn link_runs_show_their_number() {
        let run = Run {
            bounds: Rect::new(27, 40, 90, 20),
            visual_width: 90,
            text: 3..13,
            label: None,
            link_id: 2,
            media_id: 0,
            media_kind: MediaKind::None,
            pre_id: 0,
            flags: RunFlags::empty(),
        };
        assert_eq!(describe_run(&run, "Some link"), "   40 [2]   Some link");
    }

    #[test]
    fn help_page_loads_without_a_network() {
        let options = DriverOptions {
            frames: 2,
            smooth: false,
            ..DriverOptions::default()
        };
        let summary = match drive(&options) {
            Ok(summary) => summary,
            Err(error) => panic!("{error}"),
        };
        assert!(summary.frames >= 1);
        assert!(summary.draw_calls > 0);
        assert!(!summary.visible_lines.is_empty());
        assert!(
            summary
                .events
                .iter()
                .any(|event| event.starts_with("document.request.finished"))
        );
    }
}
