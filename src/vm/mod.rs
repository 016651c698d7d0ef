pub mod bridge;
pub mod engine;
pub mod headless;
pub mod ports;
pub mod preview;
