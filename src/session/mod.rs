pub mod controller;

pub use controller::{RunHandle, SessionController};
