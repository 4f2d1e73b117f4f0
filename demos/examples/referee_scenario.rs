// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Referee scenarios.
//!
//! A button with a tap and a long press sits inside a scrolling list whose pan has `High`
//! priority. Three touches show each recognizer winning in turn.
//!
//! Run:
//! - `cargo run -p understory_demos --example referee_scenario`

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use understory_gesture::callbacks::GestureCallbacks;
use understory_gesture::recognizers::{LongPress, Pan, Tap};
use understory_gesture::{GestureEngine, GesturePriority, PointerEvent, PointerId, RecognizerId};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn action(log: &Log, tag: &'static str) -> GestureCallbacks {
    let log = log.clone();
    GestureCallbacks::default().on_action(move |_| log.borrow_mut().push(tag))
}

fn report(engine: &GestureEngine, names: &[(&str, RecognizerId)], pointer: PointerId) {
    for (name, id) in names {
        println!("  {name:<10} {:?}", engine.referee_state(*id, pointer));
    }
}

fn main() {
    let log = Log::default();
    let mut engine = GestureEngine::new();
    let tap = engine.insert(Tap::default().with_callbacks(action(&log, "tap")));
    let long_press = engine.insert(LongPress::default().with_callbacks(action(&log, "long-press")));
    let started = log.clone();
    let pan = engine.insert(Pan::default().with_callbacks(
        GestureCallbacks::default().on_start(move |_| started.borrow_mut().push("pan")),
    ));
    engine.set_priority(pan, GesturePriority::High);

    // Innermost first: the button's recognizers, then the list.
    let targets = [tap, long_press, pan];
    let names = [("tap", tap), ("long-press", long_press), ("pan", pan)];

    println!("== Quick touch ==");
    engine.dispatch(&PointerEvent::down(0, 10.0, 10.0, ms(0)), &targets);
    engine.dispatch(&PointerEvent::up(0, 10.0, 10.0, ms(80)), &targets);
    report(&engine, &names, PointerId(0));
    assert_eq!(*log.borrow(), ["tap"]);
    engine.advance_time(ms(1000));

    println!("== Hold ==");
    let t0 = engine.now();
    engine.dispatch(&PointerEvent::down(1, 10.0, 10.0, t0), &targets);
    engine.advance_time(ms(600));
    report(&engine, &names, PointerId(1));
    engine.dispatch(&PointerEvent::up(1, 10.0, 10.0, engine.now()), &targets);
    assert_eq!(*log.borrow(), ["tap", "long-press"]);
    engine.advance_time(ms(1000));

    println!("== Drag ==");
    let t0 = engine.now();
    engine.dispatch(&PointerEvent::down(2, 10.0, 10.0, t0), &targets);
    for i in 1..=8_u32 {
        let y = 10.0 + f64::from(i) * 5.0;
        let t = t0 + ms(u64::from(i) * 16);
        engine.dispatch(&PointerEvent::moved(2, 10.0, y, t), &targets);
    }
    report(&engine, &names, PointerId(2));
    engine.dispatch(&PointerEvent::up(2, 10.0, 50.0, t0 + ms(200)), &targets);
    assert_eq!(*log.borrow(), ["tap", "long-press", "pan"]);
    assert!(engine.referee().is_empty());

    println!("== Callbacks ==\n  {:?}", log.borrow());
}
