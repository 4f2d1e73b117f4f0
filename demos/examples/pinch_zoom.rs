// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pinch to zoom.
//!
//! Two fingers spread apart symmetrically; the pinch reports the growing scale.
//!
//! Run:
//! - `cargo run -p understory_demos --example pinch_zoom`

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use understory_gesture::callbacks::GestureCallbacks;
use understory_gesture::recognizers::Pinch;
use understory_gesture::{GestureEngine, PointerEvent};

fn main() {
    let zoom = Rc::new(Cell::new(1.0_f64));
    let (update, end) = (zoom.clone(), zoom.clone());

    let mut engine = GestureEngine::new();
    let pinch = engine.insert(
        Pinch::default().with_callbacks(
            GestureCallbacks::default()
                .on_start(|ev| println!("start  scale {:.3}", ev.scale))
                .on_update(move |ev| {
                    update.set(ev.scale);
                    println!("update scale {:.3} at {:?}", ev.scale, ev.position);
                })
                .on_end(move |ev| {
                    end.set(ev.scale);
                    println!("end    scale {:.3}", ev.scale);
                }),
        ),
    );
    let targets = [pinch];
    let ms = Duration::from_millis;

    // Spread 50 around (150, 100).
    engine.dispatch(&PointerEvent::down(0, 100.0, 100.0, ms(0)), &targets);
    engine.dispatch(&PointerEvent::down(1, 200.0, 100.0, ms(4)), &targets);
    for i in 1..=10_u32 {
        let d = f64::from(i) * 4.0;
        let t = ms(4 + u64::from(i) * 16);
        engine.dispatch(&PointerEvent::moved(0, 100.0 - d, 100.0, t), &targets);
        engine.dispatch(&PointerEvent::moved(1, 200.0 + d, 100.0, t), &targets);
    }
    // Spread 90.
    engine.dispatch(&PointerEvent::up(0, 60.0, 100.0, ms(200)), &targets);
    engine.dispatch(&PointerEvent::up(1, 240.0, 100.0, ms(204)), &targets);

    assert!((zoom.get() - 1.8).abs() < 1e-9, "scale was {}", zoom.get());
    assert!(engine.referee().is_empty());
}
