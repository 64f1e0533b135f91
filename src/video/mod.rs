pub mod media;
pub mod stream_group;
pub mod tick;
pub mod playback_controller;
pub mod clocked_media;
pub mod tool_runner;
pub mod thumbnail;
pub mod worker;

#[cfg(test)]
pub mod fake_media;

pub use stream_group::*;
pub use playback_controller::*;
pub use clocked_media::*;
pub use tool_runner::ToolRunner;
pub use thumbnail::*;
pub use worker::*;
