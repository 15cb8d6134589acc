use anyhow::Result;
use simple_logger::{set_up_color_terminal, SimpleLogger};

/// Installs the process-wide logger. `tracing` events reach it through the
/// `log-always` feature; `RUST_LOG` overrides the default level.
pub fn init() -> Result<()> {
    set_up_color_terminal();
    let logger = SimpleLogger::new().env();
    logger.init()?;
    Ok(())
}
