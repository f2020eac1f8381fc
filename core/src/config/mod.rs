mod load;
mod types;

pub use load::{
    apply_env_overrides, get_liftoff_data_dir, load, load_default, load_from_path,
    ENV_EXECUTION_MODE, ENV_LOG_LEVEL, ENV_STREAM_FORMAT,
};
pub use types::{
    ActionConfig, AppConfig, CommandConfig, ExecutionConfig, ExecutionMode, GraphConfig,
    LoggingConfig, StreamFormat,
};
