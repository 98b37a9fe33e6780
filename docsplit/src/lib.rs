//! docsplit - troubleshooting manual splitter
//!
//! Splits word-processor manuals into one document per top-level section, tags each
//! section with the tool the manual covers, and enriches the sections with diagram
//! descriptions from a vision model.
//!
//! The core is [`splitter::split_sections`], which cuts a [`docx::DocxDocument`] at
//! heading 1/2 boundaries into independent documents. Everything else orchestrates
//! external tools around it.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::enum_variant_names)]

pub mod collaborator;
pub mod config;
pub mod convert;
pub mod docx;
pub mod metadata;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod sections;
pub mod splitter;
pub mod vision;
pub mod writer;
