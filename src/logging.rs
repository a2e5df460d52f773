use crate::Result;
use cfg_if::cfg_if;
pub use log::{debug, error, info, trace, warn};

cfg_if! {
    if #[cfg(feature = "logger_env")] {
        use crate::config::DEFAULT_LOG_LEVEL;

        /// Initializes `env_logger`, the filter defaults to `warn` when `RUST_LOG` is absent.
        /// A logger installed earlier by the application is kept.
        pub fn logger_init(_: Option<String>) -> Result<()> {
            // `try_init` only fails when a global logger already exists
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL))
                .try_init()
                .ok();
            Ok(())
        }
    }
    else if #[cfg(feature = "logger_log4rs")] {
        use crate::Error;
        use std::path::Path;

        /// Initializes `log4rs` from the given configuration file.
        pub fn logger_init(file_name: Option<String>) -> Result<()> {
            let file_name = file_name
                .ok_or_else(|| Error::msg("Must provide a configuration file for log4rs crate"))?;
            let path = Path::new(&file_name);
            if path.exists() {
                log4rs::init_file(path, Default::default())?;
            }
            Ok(())
        }
    } else {
        pub fn logger_init(_: Option<String>) -> Result<()> {
            Ok(())
        }
    }
}
