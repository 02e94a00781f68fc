/// Fallback when stdout is not a terminal or reports no size.
pub const DEFAULT_WIDTH: usize = 80;

/// Current stdout width in columns.
pub fn terminal_width() -> usize {
    console::Term::stdout()
        .size_checked()
        .map(|(_, cols)| cols as usize)
        .filter(|&cols| cols > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Print a notice whenever the terminal is resized. Rendering picks up the
/// new width on its own; this is informational only.
#[cfg(unix)]
pub fn spawn_resize_notices() -> std::io::Result<()> {
    use console::style;
    use tokio::signal::unix::{signal, SignalKind};

    let mut resized = signal(SignalKind::window_change())?;
    tokio::spawn(async move {
        while resized.recv().await.is_some() {
            let width = terminal_width();
            tracing::debug!(width, "terminal resized");
            println!(
                "\n{}",
                style(format!("Terminal resized to {width} columns")).dim()
            );
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn spawn_resize_notices() -> std::io::Result<()> {
    Ok(())
}
