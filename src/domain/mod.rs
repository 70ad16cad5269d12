pub mod drag;
pub mod models;
pub mod navigation;
pub mod view_state;
