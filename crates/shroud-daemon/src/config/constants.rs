pub const DEFAULT_PORT: u16 = 8430;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const MIN_SECRET_LEN: usize = 16;

pub const MIN_BODY_BYTES: usize = 1024;

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DATA_DIR_NAME: &str = ".shroud";
