// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested groups.
//!
//! "Hold, then drag" is a `Sequence` of a long press and a pan. It competes with a plain tap
//! inside an `Exclusive` group, so only one of the two ever fires for a touch.
//!
//! Run:
//! - `cargo run -p understory_demos --example nested_groups`

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use understory_gesture::callbacks::GestureCallbacks;
use understory_gesture::groups::{Exclusive, Sequence};
use understory_gesture::recognizers::{LongPress, Pan, Tap};
use understory_gesture::{GestureEngine, PointerEvent, PointerId};

type Log = Rc<RefCell<Vec<String>>>;

fn main() {
    let log = Log::default();
    let (held, dragged, ended, tapped) = (log.clone(), log.clone(), log.clone(), log.clone());

    let mut engine = GestureEngine::new();
    let long_press = engine.insert(LongPress::default().with_callbacks(
        GestureCallbacks::default().on_action(move |_| held.borrow_mut().push("held".into())),
    ));
    let pan = engine.insert(
        Pan::default().with_callbacks(
            GestureCallbacks::default()
                .on_start(move |_| dragged.borrow_mut().push("drag start".into()))
                .on_end(move |ev| {
                    ended
                        .borrow_mut()
                        .push(format!("drag end at {:.0}", ev.offset.x));
                }),
        ),
    );
    let hold_drag = engine.insert(Sequence::new([long_press, pan]));
    let tap = engine.insert(Tap::default().with_callbacks(
        GestureCallbacks::default().on_action(move |_| tapped.borrow_mut().push("tap".into())),
    ));
    let root = engine.insert(Exclusive::new([hold_drag, tap]));
    let targets = [root];
    let ms = Duration::from_millis;

    println!("== Tap ==");
    engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &targets);
    engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(90)), &targets);
    println!("  {:?}", log.borrow());
    assert_eq!(*log.borrow(), ["tap"]);
    engine.advance_time(ms(1000));
    log.borrow_mut().clear();

    println!("== Hold, then drag ==");
    let t0 = engine.now();
    engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, t0), &targets);
    engine.advance_time(ms(600));
    println!("  after hold: {:?}", engine.referee_state(hold_drag, PointerId(1)));
    let t1 = engine.now();
    for i in 1..=6_u32 {
        let x = f64::from(i) * 10.0;
        engine.dispatch(&PointerEvent::moved(1, x, 0.0, t1 + ms(u64::from(i) * 16)), &targets);
    }
    engine.dispatch(&PointerEvent::up(1, 60.0, 0.0, t1 + ms(120)), &targets);
    println!("  {:?}", log.borrow());
    assert_eq!(log.borrow()[..2], ["held", "drag start"]);
    assert!(engine.referee().is_empty());
}
