//! Ctrl-C forwarding: SIGINT cancels the running execution instead of
//! killing the process.

use anyhow::Result;
use ubit::CancelToken;

/// Routes SIGINT to `token` for the rest of the process.
#[cfg(unix)]
pub fn forward(token: CancelToken) -> Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT])?;
    std::thread::Builder::new()
        .name("sigint".into())
        .spawn(move || {
            for _ in signals.forever() {
                tracing::debug!("interrupt requested");
                token.cancel();
            }
        })?;
    Ok(())
}

/// No signal routing off Unix: Ctrl-C keeps its default behaviour.
#[cfg(not(unix))]
pub fn forward(token: CancelToken) -> Result<()> {
    drop(token);
    tracing::debug!("interrupt forwarding unavailable on this platform");
    Ok(())
}
