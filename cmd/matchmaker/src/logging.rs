use anyhow::Result;
use configs::LogSettings;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins over `log.level` when set.
pub fn init_tracing(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);
    if settings.json {
        builder
            .json()
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))?;
    } else {
        builder
            .compact()
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))?;
    }

    Ok(())
}
