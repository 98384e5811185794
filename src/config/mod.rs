mod server;
mod sweeper;

pub use server::{
    ADMIN_TOKEN_FILE_NAME, CONFIG_FILE_NAME, DB_FILE_NAME, FileConfig, ServerConfig,
};
pub use sweeper::SweeperConfig;
