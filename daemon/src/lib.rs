pub mod config;
pub mod coordination;
pub mod event;
pub mod fatal;
pub mod keys;
pub mod keystate;
pub mod overlay;
pub mod paths;
pub mod process_guard;
