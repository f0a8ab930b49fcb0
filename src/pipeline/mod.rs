//! Pipeline stages for CV analysis.
//!
//! Each submodule implements exactly one step, so each is testable alone and
//! the rendering, extraction and transport backends can be swapped through
//! their traits without touching the orchestrator.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ render ──▶ prompt (vision) ──┐
//! input ─────┤       (encode)                 ├─▶ scoring ──▶ response
//!            └─▶ extract ─▶ prompt (text) ────┘
//! (CvDocument) (pdfium / pdf-extract)          (HTTPS)      (score + text)
//! ```
//!
//! 1. [`input`]    CV handle: caller file or temp-spilled bytes
//! 2. [`render`]   rasterise the first pages on the blocking pool
//! 3. [`extract`]  text-layer fallback, independent of pdfium
//! 4. [`encode`]   JPEG + base64 data URLs for the request body
//! 5. [`prompt`]   conversation turns for vision or text analysis
//! 6. [`scoring`]  the chat-completion call; the only network I/O
//! 7. [`response`] score extraction and quote normalisation

pub mod encode;
pub mod extract;
pub mod input;
pub mod prompt;
pub mod render;
pub mod response;
pub mod scoring;
