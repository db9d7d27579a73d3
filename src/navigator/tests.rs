use super::*;
use crate::loader::{load_score, LoadedScore};
use crate::timeline::{build_with, Timeline};
use crate::tree::EventId;

fn index(source: &str) -> (Timeline, LoadedScore) {
    let loaded = load_score(source).unwrap();
    let timeline = build_with(&loaded.tree, &loaded.context).unwrap();
    (timeline, loaded)
}

/// Every position from the current one to the end of the score
fn walk(nav: &mut Navigator) -> Vec<CursorState> {
    let mut states = vec![nav.get_state()];
    while !nav.is_at_end_of_score() {
        nav.move_next();
        states.push(nav.get_state());
    }
    states
}

const SIMPLE_MEASURES: &str = r#"
instruments:
  - name: Flute
    events:
      - clef: G
        label: clef
      - key: C
      - time: 2/4
      - note: q
        label: first
      - rest: q
        label: rest
      - barline: simple
        label: bar
      - note: q
        label: last
"#;

const TWO_VOICES: &str = r#"
instruments:
  - name: Violin
    voices: 2
    events:
      - time: 2/4
      - note: q
        label: v1-a
      - note: q
        voice: 2
        label: v2-a
      - note: q
        voice: 2
        label: v2-b
      - barline: simple
        label: bar
      - note: q
        label: v1-b
      - note: q
        voice: 2
        label: v2-c
"#;

const PIANO: &str = r#"
instruments:
  - name: Piano
    staves: 2
    voices: 2
    events:
      - clef: G
      - clef: F
        staff: 1
      - note: w
        label: upper
      - note: w
        voice: 2
        staff: 1
        label: lower
      - barline: final
        label: end
"#;

#[test]
fn test_forward_traversal() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    let states = walk(&mut nav);

    assert_eq!(states.len(), 8);
    let times: Vec<f64> = states.iter().map(|s| s.time).collect();
    let measures: Vec<usize> = states.iter().map(|s| s.measure).collect();
    assert_eq!(times, vec![0.0, 0.0, 0.0, 0.0, 64.0, 128.0, 128.0, 192.0]);
    assert_eq!(measures, vec![0, 0, 0, 0, 0, 0, 1, 1]);

    assert_eq!(states[0].pointed, Pointed::Real(loaded.id("clef").unwrap()));
    assert_eq!(states[6].pointed, Pointed::Real(loaded.id("last").unwrap()));
    assert!(states[7].is_end_of_score());
    assert_eq!(states[7].ref_id, None);
}

#[test]
fn test_move_next_at_end_is_noop() {
    let (timeline, _) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    walk(&mut nav);
    let end = nav.get_state();
    nav.move_next();
    nav.move_next();
    assert_eq!(nav.get_state(), end);
}

#[test]
fn test_move_prev_at_start_is_noop() {
    let (timeline, _) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    let start = nav.get_state();
    nav.move_prev();
    assert_eq!(nav.get_state(), start);
}

#[test]
fn test_next_prev_round_trip() {
    let (timeline, _) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    for state in walk(&mut Navigator::new(&timeline)) {
        if !state.is_real() {
            continue;
        }
        nav.restore_state(&state);
        nav.move_next();
        nav.move_prev();
        assert_eq!(nav.get_state(), state);
    }
}

#[test]
fn test_move_prev_from_end_of_score() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    walk(&mut nav);
    nav.move_prev();
    assert_eq!(nav.get_state().id(), loaded.id("last"));
}

#[test]
fn test_empty_place_for_silent_voice() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    assert_eq!(nav.active_voice(), Some(1));

    let states = walk(&mut nav);
    let empty: Vec<&CursorState> = states.iter().filter(|s| s.is_empty_place()).collect();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].time, 64.0);
    assert_eq!(empty[0].measure, 0);
    assert_eq!(empty[0].ref_id, loaded.id("v1-b"));

    // voice 2 events are never visited
    let v2 = loaded.id("v2-a").unwrap();
    assert!(states.iter().all(|s| s.id() != Some(v2)));
    // the barline is shared
    assert!(states.iter().any(|s| s.id() == loaded.id("bar")));
}

#[test]
fn test_empty_place_queries() {
    let (timeline, _) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    nav.to_time(0, 0, 64.0);
    assert!(nav.is_at_empty_place());
    assert!(nav.current_entry().is_none());
    assert_eq!(nav.current_time(), 64.0);
}

#[test]
fn test_initial_voice_from_settings() {
    let source = format!("settings:\n  initial-voice: 2\n{}", TWO_VOICES);
    let (timeline, loaded) = index(&source);
    let mut nav = Navigator::new(&timeline);
    assert_eq!(nav.active_voice(), Some(2));
    let states = walk(&mut nav);
    assert!(states.iter().all(|s| !s.is_empty_place()));
    assert!(states.iter().any(|s| s.id() == loaded.id("v2-b")));
}

#[test]
fn test_default_voice_follows_first_event() {
    let (timeline, loaded) = index(
        r#"
instruments:
  - voices: 2
    events:
      - note: h
        voice: 2
        label: lead
      - shift: forward q
        voice: 1
      - note: q
        label: follow
"#,
    );
    let mut nav = Navigator::new(&timeline);
    assert_eq!(nav.active_voice(), Some(2));
    assert_eq!(nav.get_state().pointed, Pointed::Real(loaded.id("lead").unwrap()));

    let states = walk(&mut nav);
    assert_eq!(states.len(), 3);
    // voice 1 enters at 64 while the half note still sounds
    assert!(states[1].is_empty_place());
    assert_eq!(states[1].time, 64.0);
    assert_eq!(states[1].ref_id, loaded.id("lead"));
    assert_eq!(states[2].time, 128.0);
}

#[test]
fn test_trailing_empty_place_anchors_backwards() {
    let (timeline, loaded) = index(
        r#"
instruments:
  - voices: 2
    events:
      - note: q
        label: only
      - note: q
        voice: 2
      - note: q
        voice: 2
"#,
    );
    let mut nav = Navigator::new(&timeline);
    nav.change_voice_to(1);
    assert_eq!(nav.get_state().id(), loaded.id("only"));

    nav.move_next();
    let state = nav.get_state();
    assert!(state.is_empty_place());
    assert_eq!(state.time, 64.0);
    assert_eq!(state.ref_id, loaded.id("only"));

    nav.move_next();
    assert!(nav.is_at_end_of_score());
    nav.restore_state(&state);
    assert_eq!(nav.get_state(), state);
}

#[test]
fn test_change_voice_same_time() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("v1-a").unwrap());

    nav.change_voice_to(2);
    assert_eq!(nav.active_voice(), Some(2));
    assert_eq!(nav.get_state().id(), loaded.id("v2-a"));

    nav.move_next();
    assert_eq!(nav.get_state().id(), loaded.id("v2-b"));

    // voice 1 is silent at 64
    nav.change_voice_to(1);
    let state = nav.get_state();
    assert!(state.is_empty_place());
    assert_eq!(state.time, 64.0);
    assert_eq!(state.voice, Some(1));

    nav.change_voice_to(2);
    assert_eq!(nav.get_state().id(), loaded.id("v2-b"));
}

#[test]
fn test_change_voice_keeps_shared_object() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    let bar = loaded.id("bar").unwrap();
    nav.point_to(bar);
    nav.change_voice_to(2);
    assert_eq!(nav.get_state().id(), Some(bar));
}

#[test]
fn test_change_voice_at_end_of_score() {
    let (timeline, _) = index(
        r#"
instruments:
  - voices: 2
    events:
      - note: q
      - note: h
        voice: 2
"#,
    );
    let mut nav = Navigator::new(&timeline);
    walk(&mut nav);
    assert_eq!(nav.get_state().time, 64.0);

    nav.change_voice_to(2);
    assert!(nav.is_at_end_of_score());
    assert_eq!(nav.get_state().time, 128.0);

    nav.change_voice_to(1);
    assert_eq!(nav.get_state().time, 64.0);
}

#[test]
fn test_point_to_switches_voice() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    let target = loaded.id("v2-b").unwrap();
    nav.point_to(target);
    assert_eq!(nav.get_state().pointed, Pointed::Real(target));
    assert_eq!(nav.active_voice(), Some(2));
    assert_eq!(nav.get_state().voice, Some(2));
}

#[test]
fn test_point_to_unknown_id() {
    let (timeline, _) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    nav.point_to(EventId(999));
    assert!(nav.is_at_end_of_score());
    assert_eq!(nav.current_time(), 192.0);
}

#[test]
fn test_point_to_chord_member() {
    let (timeline, loaded) = index(
        r#"
instruments:
  - events:
      - note: q
      - note: q
        chord: true
        label: member
"#,
    );
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("member").unwrap());
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_multi_staff_traversal() {
    let (timeline, loaded) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    let states = walk(&mut nav);

    // clef, note, barline, end of staff, clef, note, barline, end of score
    assert_eq!(states.len(), 8);
    assert!(states[3].is_end_of_staff());
    assert_eq!(states[3].time, 256.0);
    assert_eq!(states[3].measure, 1);
    assert_eq!((states[4].instrument, states[4].staff), (0, 1));
    assert_eq!(states[5].id(), loaded.id("lower"));
    assert!(states[7].is_end_of_score());
    assert_eq!(states.iter().filter(|s| s.is_end_of_score()).count(), 1);
}

#[test]
fn test_move_prev_across_staves() {
    let (timeline, loaded) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("lower").unwrap());
    nav.move_prev();
    nav.move_prev();
    assert!(nav.is_at_end_of_staff());
    assert_eq!(nav.get_state().staff, 0);
    nav.move_prev();
    assert_eq!(nav.get_state().id(), loaded.id("end"));
    assert_eq!(nav.get_state().staff, 0);
}

#[test]
fn test_point_to_barline_per_staff() {
    let (timeline, loaded) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    let end = loaded.id("end").unwrap();

    nav.point_to_barline(end, 1);
    let state = nav.get_state();
    assert_eq!(state.pointed, Pointed::Real(end));
    assert_eq!(state.staff, 1);
    assert_eq!(state.time, 256.0);

    nav.point_to(end);
    assert_eq!(nav.get_state().staff, 0);

    nav.point_to_barline(end, 4);
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_to_measure() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);

    nav.to_measure(1);
    assert_eq!(nav.get_state().id(), loaded.id("last"));
    assert_eq!(nav.current_measure(), 1);

    nav.to_measure(0);
    assert_eq!(nav.get_state().id(), loaded.id("clef"));

    nav.to_measure(5);
    assert!(nav.is_at_end_of_score());

    nav.to_measure_in(0, 9, 0);
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_to_measure_in_clamps_to_end_of_staff() {
    let (timeline, loaded) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    nav.to_measure_in(3, 0, 0);
    assert!(nav.is_at_end_of_staff());
    nav.to_measure_in(0, 0, 1);
    assert_eq!(nav.get_state().staff, 1);
    nav.move_next();
    assert_eq!(nav.get_state().id(), loaded.id("lower"));
}

#[test]
fn test_to_time() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);

    nav.to_time(0, 0, 64.0);
    assert_eq!(nav.get_state().id(), loaded.id("rest"));

    nav.to_time(0, 0, 100.0);
    assert_eq!(nav.get_state().id(), loaded.id("bar"));

    nav.to_time(0, 0, 1000.0);
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_state_restore_identity() {
    let (timeline, _) = index(TWO_VOICES);
    let states = walk(&mut Navigator::new(&timeline));
    let mut nav = Navigator::new(&timeline);
    for state in &states {
        nav.restore_state(state);
        assert_eq!(&nav.get_state(), state);
    }
}

#[test]
fn test_state_restore_keeps_voice() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("v2-c").unwrap());
    let saved = nav.get_state();

    nav.change_voice_to(1);
    nav.to_measure(0);
    nav.restore_state(&saved);
    assert_eq!(nav.active_voice(), Some(2));
    assert_eq!(nav.get_state(), saved);
}

#[test]
fn test_reset_and_point_to() {
    let (timeline, loaded) = index(TWO_VOICES);
    let mut nav = Navigator::new(&timeline);
    nav.change_voice_to(2);
    nav.reset_and_point_to(loaded.id("bar").unwrap());
    // voice selection forgotten
    assert_eq!(nav.active_voice(), Some(1));
    assert_eq!(nav.get_state().id(), loaded.id("bar"));
}

#[test]
fn test_reset_and_point_after_existing() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    nav.reset_and_point_after(loaded.id("bar").unwrap());
    assert_eq!(nav.get_state().id(), loaded.id("last"));

    nav.reset_and_point_after(loaded.id("last").unwrap());
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_reset_and_point_after_removed() {
    let (mut timeline, loaded) = index(SIMPLE_MEASURES);
    let mut tree = loaded.tree.clone();
    let first = loaded.id("first").unwrap();
    let last = loaded.id("last").unwrap();
    tree.remove(first).unwrap();
    tree.remove(last).unwrap();
    timeline.rebuild(&tree).unwrap();

    let mut nav = Navigator::new(&timeline);
    nav.reset_and_point_after(first);
    assert_eq!(nav.get_state().id(), loaded.id("rest"));

    nav.reset_and_point_after(last);
    assert!(nav.is_at_end_of_score());

    // never in the timeline
    nav.reset_and_point_after(EventId(999));
    assert!(nav.is_at_end_of_score());
}

#[test]
fn test_reset_and_point_after_removed_last_of_staff() {
    let (mut timeline, loaded) = index(
        r#"
instruments:
  - name: Flute
    events:
      - note: q
      - note: q
        label: gone
  - name: Oboe
    events:
      - note: q
"#,
    );
    let mut tree = loaded.tree.clone();
    let gone = loaded.id("gone").unwrap();
    tree.remove(gone).unwrap();
    timeline.rebuild_instrument(&tree, 0).unwrap();

    let mut nav = Navigator::new(&timeline);
    nav.reset_and_point_after(gone);
    assert!(nav.is_at_end_of_staff());
    assert_eq!(nav.get_state().instrument, 0);
    assert_eq!(nav.get_state().time, 64.0);
}

#[test]
fn test_empty_score() {
    let (timeline, _) = index("instruments: []");
    let mut nav = Navigator::new(&timeline);
    assert!(nav.is_at_end_of_score());
    nav.move_prev();
    nav.move_next();
    let state = nav.get_state();
    assert!(state.is_end_of_score());
    assert_eq!(state.time, 0.0);
    assert_eq!(nav.get_time_info().total_duration, 0.0);
}

#[test]
fn test_time_info_simple_meter() {
    let (timeline, loaded) = index(SIMPLE_MEASURES);
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("rest").unwrap());
    let info = nav.get_time_info();
    assert_eq!(info.current_time, 64.0);
    assert_eq!(info.total_duration, 192.0);
    assert_eq!(info.beat_duration, 64.0);
    assert_eq!(info.measure_start_time, 0.0);
    assert_eq!(info.beats_from_measure_start(), 1.0);

    nav.point_to(loaded.id("last").unwrap());
    assert_eq!(nav.get_time_info().measure_start_time, 128.0);
}

#[test]
fn test_time_info_compound_meter() {
    let (timeline, loaded) = index(
        r#"
instruments:
  - events:
      - time: 6/8
      - note: q.
      - note: q.
      - barline: simple
      - note: q.
      - note: q.
        label: second-beat
"#,
    );
    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("second-beat").unwrap());
    let info = nav.get_time_info();
    assert_eq!(info.beat_duration, 96.0);
    assert_eq!(info.current_time, 288.0);
    assert_eq!(info.measure_start_time, 192.0);
    assert_eq!(info.beats_from_measure_start(), 1.0);
}

#[test]
fn test_time_info_default_meter() {
    let (timeline, _) = index("settings:\n  default-time-signature: 3/8\ninstruments:\n  - events:\n      - note: e\n");
    let nav = Navigator::new(&timeline);
    assert_eq!(nav.get_time_info().beat_duration, 32.0);

    let (timeline, _) = index("instruments:\n  - events:\n      - note: e\n");
    let nav = Navigator::new(&timeline);
    assert_eq!(nav.get_time_info().beat_duration, 64.0);
}

#[test]
fn test_with_context_overrides_timeline_settings() {
    let (timeline, _) = index(TWO_VOICES);
    let context = crate::context::ScoreContext {
        initial_voice: Some(2),
        ..Default::default()
    };
    let nav = Navigator::with_context(&timeline, &context);
    assert_eq!(nav.active_voice(), Some(2));
    assert_eq!(nav.context(), &context);
}

#[test]
fn test_repeated_jumps_between_staves() {
    let (timeline, loaded) = index(PIANO);
    let mut nav = Navigator::new(&timeline);
    let upper = loaded.id("upper").unwrap();
    let lower = loaded.id("lower").unwrap();
    let end = loaded.id("end").unwrap();

    for _ in 0..3 {
        nav.point_to(lower);
        assert_eq!(nav.get_state().pointed, Pointed::Real(lower));
        nav.point_to_barline(end, 1);
        let state = nav.get_state();
        assert_eq!((state.staff, state.id()), (1, Some(end)));
        nav.point_to(upper);
        let state = nav.get_state();
        assert_eq!((state.staff, state.id()), (0, Some(upper)));
        nav.move_next();
        nav.restore_state(&state);
        assert_eq!(nav.get_state(), state);
    }
}

#[test]
fn test_voice_switches_keep_views_consistent() {
    let (timeline, loaded) = index(TWO_VOICES);
    let expected: Vec<Pointed> = walk(&mut Navigator::new(&timeline))
        .iter()
        .map(|s| s.pointed)
        .collect();

    let mut nav = Navigator::new(&timeline);
    nav.point_to(loaded.id("v1-b").unwrap());
    for voice in [2, 1, 2, 1] {
        nav.change_voice_to(voice);
    }
    assert_eq!(nav.get_state().id(), loaded.id("v1-b"));

    nav.to_measure(0);
    let pointed: Vec<Pointed> = walk(&mut nav).iter().map(|s| s.pointed).collect();
    assert_eq!(pointed, expected);
}
