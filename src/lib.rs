//! Async OCR and text-to-speech pipeline.
//!
//! This library provides the core functionality for the readout system:
//! HTTP submission of document images and text strings, background
//! processing against recognition/synthesis/storage collaborators, and a
//! polled task-status protocol with checkpointed progress.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
