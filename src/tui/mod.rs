mod app;

pub use app::{App, Focus, InputMode, MenuPanel};
