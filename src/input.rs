//! imgui input state to the module's frame input.

use bp_ir::{keys, FrameInput};

/// Keys forwarded to the module and the bit each sets.
pub const KEY_BITS: [(imgui::Key, u32); 8] = [
    (imgui::Key::Space, keys::SPACE),
    (imgui::Key::R, keys::R),
    (imgui::Key::E, keys::E),
    (imgui::Key::P, keys::P),
    (imgui::Key::Q, keys::Q),
    (imgui::Key::Alpha1, keys::ONE),
    (imgui::Key::Alpha2, keys::TWO),
    (imgui::Key::Alpha3, keys::THREE),
];

/// Capture this frame's window metrics, pointer and pressed keys.
///
/// Keys are not forwarded while an imgui widget wants text input.
pub fn frame_input(ui: &imgui::Ui) -> FrameInput {
    let io = ui.io();
    let keys_pressed = if io.want_text_input {
        0
    } else {
        KEY_BITS
            .iter()
            .filter(|(key, _)| ui.is_key_pressed(*key))
            .fold(0, |bits, (_, bit)| bits | bit)
    };
    FrameInput {
        width: io.display_size[0],
        height: io.display_size[1],
        delta: io.delta_time,
        pointer_x: io.mouse_pos[0],
        pointer_y: io.mouse_pos[1],
        pointer_down: ui.is_mouse_down(imgui::MouseButton::Left),
        keys_pressed,
    }
}
