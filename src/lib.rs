// ABOUTME: Root library module exposing all public modules.
// ABOUTME: Event classification, reply correlation, dialogues, scheduler, and the config API.

pub mod apiclient;
pub mod config;
pub mod correlation;
pub mod dialogue;
pub mod event;
pub mod parse;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod slack;
pub mod storage;
pub mod store;
pub mod transport;
pub mod types;
