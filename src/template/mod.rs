//! Template layer.
//!
//! Templates live on disk, one directory per template:
//!
//! ```text
//! templates/
//! ├── invoice/
//! │   ├── main.typ      (required)
//! │   ├── data.json     (optional default data)
//! │   └── logo.png      (any asset main.typ references)
//! └── letter/
//!     └── main.typ
//! ```
//!
//! Nothing here is cached: every request re-reads the template so edits on
//! disk take effect immediately.
//!
//! # Components
//!
//! - [`TemplateStore`]: resolves a template name to its files and default data
//! - [`merge_data`]: overlays request overrides on the default data

mod merge;
mod store;

pub use merge::{json_kind, merge_data, parse_overrides};
pub use store::{
    validate_template_name, Template, TemplateStore, DATA_FILE, MAIN_FILE, MAX_TEMPLATE_NAME_LEN,
};
