pub mod microphone;
pub mod notifier;
