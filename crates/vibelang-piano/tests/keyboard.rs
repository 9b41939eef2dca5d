//! End-to-end behavior of the keyboard through its public API

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Receiver;
use vibelang_piano::{
    EventKind, InputEvent, KeyId, Keyboard, KeyboardEvent, KeyboardOptions, MidiOutput, QwertyMode, Touch,
};

// Default PianoGeometry: white keys 24 wide and 120 tall from the origin,
// black keys 72 tall. y = 100 is below the black keys, y = 50 is on them.
const C3: (f32, f32) = (5.0, 100.0);
const D3: (f32, f32) = (36.0, 100.0);
const E3: (f32, f32) = (60.0, 100.0);
const OFF: (f32, f32) = (5.0, 500.0);

fn keyboard_with(options: KeyboardOptions) -> (Keyboard, Receiver<KeyboardEvent>) {
    let mut keyboard = Keyboard::new(options).unwrap();
    let rx = keyboard.stream();
    (keyboard, rx)
}

fn keyboard() -> (Keyboard, Receiver<KeyboardEvent>) {
    keyboard_with(KeyboardOptions::default())
}

fn touch(id: u64, (x, y): (f32, f32)) -> Touch {
    Touch::new(id, x, y)
}

fn drain(rx: &Receiver<KeyboardEvent>) -> Vec<KeyboardEvent> {
    rx.try_iter().collect()
}

#[test]
fn test_range_c3_to_c4() {
    let (mut keyboard, rx) = keyboard();
    assert_eq!(keyboard.layout().len(), 12);

    keyboard.note_on("C3");
    assert_eq!(drain(&rx), vec![KeyboardEvent::NoteOn { which: 48, value: 127 }]);
}

#[test]
fn test_note_on_twice_emits_once() {
    let (mut keyboard, rx) = keyboard();
    keyboard.note_on("C3").note_on(48u8);
    assert_eq!(drain(&rx).len(), 1);
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48]);
}

#[test]
fn test_unknown_and_out_of_range_notes_are_ignored() {
    let (mut keyboard, rx) = keyboard();
    keyboard.note_on("C5").note_on(200).note_on("H2").note_off("C3");
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_move_from_a_to_b_turns_a_off_first() {
    let (mut keyboard, rx) = keyboard();
    keyboard
        .handle(InputEvent::TouchStart(vec![touch(1, C3)]))
        .handle(InputEvent::TouchMove(vec![touch(1, D3)]));
    assert_eq!(
        drain(&rx),
        vec![
            KeyboardEvent::note_on(48, 127),
            KeyboardEvent::note_off(48),
            KeyboardEvent::note_on(50, 127),
        ]
    );
}

#[test]
fn test_two_touches_on_one_key_play_it_once() {
    let (mut keyboard, rx) = keyboard();
    keyboard.handle(InputEvent::TouchStart(vec![touch(1, C3), touch(2, (10.0, 100.0))]));
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_on(48, 127)]);

    // The first touch leaves; the second one still holds the key
    keyboard.handle(InputEvent::TouchMove(vec![touch(1, OFF), touch(2, (10.0, 100.0))]));
    assert!(drain(&rx).is_empty());
    assert!(keyboard.is_active(48));

    keyboard.handle(InputEvent::TouchEnd(vec![]));
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_off(48)]);
}

#[test]
fn test_touch_on_a_claimed_key_plays_the_key_beside_it() {
    let (mut keyboard, rx) = keyboard();
    // x = 24 is the shared edge of C3 and D3
    keyboard.handle(InputEvent::TouchStart(vec![touch(1, C3), touch(2, (24.0, 100.0))]));
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48, 50]);
    assert_eq!(drain(&rx).len(), 2);

    // Two touches on C#3: the second one sounds C3 beneath
    keyboard.handle(InputEvent::TouchMove(vec![touch(1, (20.0, 10.0)), touch(2, (22.0, 12.0))]));
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48, 49]);
}

#[test]
fn test_out_of_range_emulated_press_is_not_held() {
    let (mut keyboard, rx) = keyboard_with(KeyboardOptions {
        qwerty: QwertyMode::Tracker,
        ..KeyboardOptions::default()
    });
    // 'p' is 28 semitones up, past the C3..C4 range
    keyboard.handle(InputEvent::QwertyDown('p'));
    assert!(drain(&rx).is_empty());
    assert!(keyboard.pressed_keys().is_empty());
}

#[test]
fn test_chord_of_touches() {
    let (mut keyboard, rx) = keyboard();
    keyboard.handle(InputEvent::TouchStart(vec![touch(1, C3), touch(2, E3), touch(3, (108.0, 100.0))]));
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48, 52, 55]);

    // Lifting one finger only releases its key
    keyboard.handle(InputEvent::TouchEnd(vec![touch(1, C3), touch(3, (108.0, 100.0))]));
    assert_eq!(drain(&rx).last(), Some(&KeyboardEvent::note_off(52)));
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48, 55]);
}

#[test]
fn test_black_key_wins_over_white_key_beneath() {
    let (mut keyboard, rx) = keyboard();
    // On the C/D boundary, high enough to be on C#
    keyboard.handle(InputEvent::PointerDown { x: 24.0, y: 50.0 });
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_on(49, 127)]);
}

#[test]
fn test_chord_lock_holds_notes_until_release() {
    let (mut keyboard, rx) = keyboard();
    keyboard.handle(InputEvent::TouchStart(vec![touch(1, C3), touch(2, E3)]));
    assert_eq!(drain(&rx).len(), 2);

    keyboard
        .handle(InputEvent::ModifierDown)
        .handle(InputEvent::TouchMove(vec![touch(1, OFF), touch(2, OFF)]))
        .handle(InputEvent::TouchEnd(vec![]));
    assert!(drain(&rx).is_empty());
    assert!(keyboard.is_locked());
    assert_eq!(keyboard.active_notes().collect::<Vec<_>>(), vec![48, 52]);

    keyboard.handle(InputEvent::ModifierUp);
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_off(48), KeyboardEvent::note_off(52)]);
    assert!(!keyboard.is_locked());
}

#[test]
fn test_chord_lock_keeps_notes_still_touched() {
    let (mut keyboard, rx) = keyboard();
    keyboard
        .handle(InputEvent::PointerDown { x: C3.0, y: C3.1 })
        .handle(InputEvent::ModifierDown)
        .handle(InputEvent::ModifierUp);
    // The mouse is still on C3
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_on(48, 127)]);
    assert!(keyboard.is_active(48));
}

#[test]
fn test_notes_played_while_locked_are_held_too() {
    let (mut keyboard, rx) = keyboard();
    keyboard
        .handle(InputEvent::ModifierDown)
        .handle(InputEvent::PointerDown { x: C3.0, y: C3.1 })
        .handle(InputEvent::PointerUp);
    assert!(keyboard.is_active(48));

    keyboard.handle(InputEvent::ModifierUp);
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_on(48, 127), KeyboardEvent::note_off(48)]);
}

#[test]
fn test_blur_releases_everything() {
    let (mut keyboard, rx) = keyboard();
    keyboard
        .handle(InputEvent::TouchStart(vec![touch(1, C3)]))
        .handle(InputEvent::ModifierDown)
        .handle(InputEvent::Blur);
    assert!(!keyboard.is_locked());
    assert_eq!(keyboard.active_notes().count(), 0);
    assert_eq!(drain(&rx).last(), Some(&KeyboardEvent::note_off(48)));
}

#[test]
fn test_note_off_all_releases_every_note() {
    let (mut keyboard, rx) = keyboard();
    keyboard.note_on_many(["C3", "E3", "G3"], &[]);
    assert_eq!(drain(&rx).len(), 3);

    keyboard.note_off_all();
    let offs = drain(&rx);
    assert_eq!(offs.len(), 3);
    assert!(offs.iter().all(|e| e.kind() == EventKind::NoteOff));
    assert_eq!(keyboard.active_notes().count(), 0);
}

#[test]
fn test_note_on_many_repeats_last_velocity() {
    let (mut keyboard, rx) = keyboard();
    keyboard.note_on_many([48u8, 52, 55], &[90, 80]);
    let values: Vec<u8> = drain(&rx).iter().map(|e| e.value()).collect();
    assert_eq!(values, vec![90, 80, 80]);
}

#[test]
fn test_emulated_zero_velocity_press_is_a_release() {
    let (mut keyboard, rx) = keyboard();
    keyboard.feed_emulated([0x90, 0, 100]).feed_emulated([0x90, 0, 0]);
    let zero_velocity = drain(&rx);

    keyboard.feed_emulated([0x90, 0, 100]).feed_emulated([0x80, 0, 0]);
    let explicit = drain(&rx);

    assert_eq!(zero_velocity, explicit);
    assert_eq!(explicit, vec![KeyboardEvent::note_on(48, 100), KeyboardEvent::note_off(48)]);
    assert!(keyboard.pressed_keys().is_empty());
}

#[test]
fn test_qwerty_keys_play_notes() {
    let (mut keyboard, rx) = keyboard_with(KeyboardOptions {
        qwerty: QwertyMode::Piano,
        velocity: 100,
        ..KeyboardOptions::default()
    });
    keyboard
        .handle(InputEvent::QwertyDown('a'))
        .handle(InputEvent::QwertyDown('a'))
        .handle(InputEvent::QwertyDown('w'))
        .handle(InputEvent::QwertyUp('a'))
        .handle(InputEvent::QwertyUp('w'));
    assert_eq!(
        drain(&rx),
        vec![
            KeyboardEvent::note_on(48, 100),
            KeyboardEvent::note_on(49, 100),
            KeyboardEvent::note_off(48),
            KeyboardEvent::note_off(49),
        ]
    );
}

#[test]
fn test_lock_release_keeps_held_qwerty_notes() {
    let (mut keyboard, rx) = keyboard_with(KeyboardOptions {
        qwerty: QwertyMode::Piano,
        ..KeyboardOptions::default()
    });
    keyboard
        .handle(InputEvent::TouchStart(vec![touch(1, E3)]))
        .handle(InputEvent::QwertyDown('a'))
        .handle(InputEvent::ModifierDown)
        .handle(InputEvent::TouchEnd(vec![]))
        .handle(InputEvent::ModifierUp);
    assert_eq!(
        drain(&rx),
        vec![
            KeyboardEvent::note_on(52, 127),
            KeyboardEvent::note_on(48, 127),
            KeyboardEvent::note_off(52),
        ]
    );
    assert!(keyboard.is_active(48));

    keyboard.handle(InputEvent::QwertyUp('a'));
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_off(48)]);
}

#[test]
fn test_subscribe_and_unsubscribe() {
    let (mut keyboard, _) = keyboard();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = seen.clone();
    let id = keyboard.on(EventKind::NoteOn, move |e| sink.borrow_mut().push(e.which()));
    keyboard.note_on("C3").note_off("C3");
    assert_eq!(*seen.borrow(), vec![48]);

    assert!(keyboard.off(id));
    assert!(!keyboard.off(id));
    keyboard.note_on("D3");
    assert_eq!(*seen.borrow(), vec![48]);
}

#[test]
fn test_disable_is_idempotent_and_ignores_input() {
    let (mut keyboard, rx) = keyboard();
    keyboard.note_on("C3");
    drain(&rx);

    keyboard.disable().disable();
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_off(48)]);
    assert!(!keyboard.is_enabled());

    keyboard.handle(InputEvent::PointerDown { x: C3.0, y: C3.1 });
    assert!(drain(&rx).is_empty());

    keyboard.enable().handle(InputEvent::PointerDown { x: C3.0, y: C3.1 });
    assert_eq!(drain(&rx), vec![KeyboardEvent::note_on(48, 127)]);
}

#[test]
fn test_numeric_range_endpoints() {
    let (keyboard, _) = keyboard_with(KeyboardOptions {
        range: (KeyId::Number(21), KeyId::Number(109)),
        ..KeyboardOptions::default()
    });
    assert_eq!(keyboard.layout().len(), 88);
    assert_eq!(keyboard.layout().white_keys().count(), 52);
}

struct RecordingOutput {
    log: Rc<RefCell<Vec<(u8, u8, u8)>>>,
}

impl MidiOutput for RecordingOutput {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.log.borrow_mut().push((channel, note, velocity));
    }

    fn note_off(&self, channel: u8, note: u8) {
        self.log.borrow_mut().push((channel, note, 0));
    }

    fn port_name(&self) -> &str {
        "recording"
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[test]
fn test_events_reach_the_output() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut keyboard = Keyboard::new(KeyboardOptions {
        channel: 3,
        ..KeyboardOptions::default()
    })
    .unwrap()
    .with_output(RecordingOutput { log: log.clone() });

    keyboard.note_on_with_velocity("A3", 64).note_off("A3");
    assert_eq!(*log.borrow(), vec![(3, 57, 64), (3, 57, 0)]);
    assert_eq!(keyboard.output().port_name(), "recording");
}
