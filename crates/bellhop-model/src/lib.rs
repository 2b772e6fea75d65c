// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini API client for Bellhop.
//!
//! One client serves both trait seams from `bellhop-core`:
//! [`bellhop_core::ModelProvider`] through `generateContent` and
//! [`bellhop_core::EmbeddingProvider`] through `embedContent`.

pub mod client;
pub mod types;

pub use client::GeminiClient;
