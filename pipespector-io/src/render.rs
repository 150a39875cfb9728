use crate::framing::Framing;
use pipespector_core::Unit;

/// Console-safe rendering of a unit, always ending in exactly one newline.
///
/// Text units print as themselves. Binary units print escaped
/// (`\xff`, `\n`, ...) so control bytes cannot mess with the terminal.
pub fn render_unit(unit: &Unit, framing: Framing) -> String {
    match framing {
        Framing::Text => {
            let text = unit.to_text_lossy();
            if text.ends_with('\n') {
                text.into_owned()
            } else {
                format!("{}\n", text)
            }
        }
        Framing::Binary => format!("b\"{}\"\n", unit.as_bytes().escape_ascii()),
    }
}

/// Render an optional slot, naming it when empty.
pub fn render_slot(slot: Option<&Unit>, label: &str, framing: Framing) -> String {
    match slot {
        Some(unit) => render_unit(unit, framing),
        None => format!("No {} value available\n", label),
    }
}
