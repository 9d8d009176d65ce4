//! Image Mixer: combine source images with a text prompt through a
//! multimodal model behind a small HTTP relay.
//!
//! Relay side: [`relay`], [`gemini`], [`server`], [`config`].
//! Client side: [`workbench`] plus its adapters ([`upload`], [`camera`],
//! [`drawing`]), the [`collection`] it edits and the [`client`] it talks
//! through. [`wire`] is shared by both.

pub mod camera;
pub mod client;
pub mod collection;
pub mod config;
pub mod data_url;
pub mod drawing;
pub mod gemini;
pub mod image_record;
pub mod prompt;
pub mod relay;
pub mod server;
pub mod storage;
pub mod upload;
pub mod wire;
pub mod workbench;
