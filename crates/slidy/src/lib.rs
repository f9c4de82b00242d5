pub mod collection;
pub mod config;
pub mod events;
pub mod navigation;
pub mod session;
pub mod settings;
pub mod shell;
pub mod transition;
pub mod tasks {
    pub mod autoplay;
    pub mod console;
    pub mod files;
    pub mod persist;
    pub mod viewer;
}
