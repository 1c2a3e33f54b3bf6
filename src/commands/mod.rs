pub mod check;
pub mod init;
pub mod robots;

pub use check::run_check;
pub use init::init_config;
pub use robots::robots_check;
