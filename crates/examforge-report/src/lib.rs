//! examforge-report — Rendering of assembled forms.
//!
//! Turns `TestForm`s into printable markdown (exam paper and answer-key
//! sheet) and exports the full assembly output as JSON.

pub mod json;
pub mod markdown;

pub use json::write_json_output;
pub use markdown::{render_answer_key, render_form, write_markdown_forms};
