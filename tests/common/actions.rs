//! Action list builders

use mkd_replay::replay::{ActionRecord, MouseButton};

/// Two clicks, two key presses and two moves, half a second apart
pub fn mixed_session() -> Vec<ActionRecord> {
    vec![
        ActionRecord::mouse_move(0.0, 20, 20),
        ActionRecord::mouse_click(0.5, 20, 20, MouseButton::Left),
        ActionRecord::key_press(1.0, "h"),
        ActionRecord::mouse_move(1.5, 120, 80),
        ActionRecord::mouse_click(2.0, 120, 80, MouseButton::Right),
        ActionRecord::key_press(2.5, "Key.enter"),
    ]
}

/// `count` single-character key presses spaced `spacing` seconds apart
pub fn spaced_key_presses(count: usize, spacing: f64) -> Vec<ActionRecord> {
    (0..count)
        .map(|i| {
            let key = char::from(b'a' + (i % 26) as u8).to_string();
            ActionRecord::key_press(i as f64 * spacing, key)
        })
        .collect()
}

/// `moves` mouse moves followed by `others` clicks, interleaved in time
pub fn moves_and_clicks(moves: usize, others: usize) -> Vec<ActionRecord> {
    let mut actions = Vec::with_capacity(moves + others);
    for i in 0..moves.max(others) {
        let t = i as f64 * 0.1;
        if i < moves {
            actions.push(ActionRecord::mouse_move(t, i as i32, i as i32));
        }
        if i < others {
            actions.push(ActionRecord::mouse_click(t + 0.05, i as i32, 0, MouseButton::Left));
        }
    }
    actions
}
