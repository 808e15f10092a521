// Core module - Relay engine
pub mod relay;
