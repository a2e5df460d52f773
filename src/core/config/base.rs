use super::{constant::*, ConfigEntity};
use crate::{logging, utils, Error, Result};
use std::env;
use std::fs;
use std::path::Path;

/// `load_config` resolves the general configuration.
/// Priority: system environment > YAML file > default config.
/// A blank `config_path` is resolved from `SENTINEL_CONFIG_FILE_PATH`, the defaults are used when it is absent too.
pub fn load_config(config_path: &str) -> Result<ConfigEntity> {
    let config_path = if utils::is_blank(config_path) {
        env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_else(|_| CONFIG_FILENAME.into())
    } else {
        config_path.to_owned()
    };
    let mut entity = if config_path == CONFIG_FILENAME {
        ConfigEntity::new()
    } else {
        load_config_from_yaml_file(&config_path)?
    };
    override_items_from_system_env(&mut entity)?;
    Ok(entity)
}

/// `load_config_from_yaml_file` parses and checks the YAML file under the given path.
pub fn load_config_from_yaml_file(path_str: &str) -> Result<ConfigEntity> {
    let path = Path::new(path_str);
    if !path.exists() {
        return Err(Error::msg(format!(
            "Sentinel YAML configuration file does not exist: {}",
            path_str
        )));
    }
    let content = fs::read_to_string(path)?;
    let entity: ConfigEntity = serde_yaml::from_str(&content)?;
    entity.check()?;
    logging::info!(
        "[Config] Resolving Sentinel config from file, file {}",
        path_str
    );
    Ok(entity)
}

fn override_items_from_system_env(entity: &mut ConfigEntity) -> Result<()> {
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            entity.config.app.app_name = app_name;
        }
    }
    entity.check()
}

/// `init_log` initializes the logging backend selected by the crate features.
pub fn init_log(entity: &ConfigEntity) -> Result<()> {
    logging::logger_init(Some(entity.log_config_file().to_owned()))?;
    logging::info!("[Config] App name resolved, appName {}", entity.app_name());
    logging::info!(
        "[Config] Print effective global config, globalConfig {:?}",
        entity
    );
    Ok(())
}
