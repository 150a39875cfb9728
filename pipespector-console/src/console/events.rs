use pipespector_core::StreamEvent;
use pipespector_io::Framing;
use pipespector_io::render::render_unit;

pub const EXHAUSTED_MESSAGE: &str = "No more items left -- exiting program...";

/// Console text for an event reported by the forwarding loop (or a step).
/// No trailing newline.
pub fn render_event(event: &StreamEvent, framing: Framing) -> String {
    match event {
        StreamEvent::BreakpointHit {
            sequence,
            pattern,
            unit,
        } => {
            let mut rendered = render_unit(unit, framing);
            rendered.pop();
            format!(
                "🔴 Breakpoint '{}' hit at ({}):\n{}",
                pattern, sequence, rendered
            )
        }
        StreamEvent::Paused { sequence } => format!("Pipe closed at ({})", sequence),
        StreamEvent::Exhausted { .. } => EXHAUSTED_MESSAGE.to_string(),
        StreamEvent::Failed { sequence, message } => {
            format!("❌ Pipe failed at ({}): {}", sequence, message)
        }
    }
}
