//! # fixedlen-rs
//!
//! Binding of mainframe-style fixed-length text records onto typed values.
//!
//! Each line of a fixed-length file is a sequence of columns at known
//! 1-based positions. A model describes those columns per record type; a
//! line may populate several record types at once when one type links to
//! others, and a file may open with a header record and close with a
//! footer record of their own types.
//!
//! ## Overview
//!
//! - **Model**: [`RecordDef`], [`FieldDef`] and [`LayoutDef`] builders, or a
//!   TOML model file read by [`load_model`]
//! - **Compilation**: [`FixedLengthFormat::new`] discovers linked types,
//!   validates positions and lengths, and resolves the file layout
//! - **Binding**: [`FixedLengthFormat::unmarshal`] turns input into a
//!   [`BindResult`] of header, entries and footer
//! - **Writing**: [`FixedLengthFormat::marshal`] pads and aligns records back
//!   to fixed-length text
//!
//! ## Example
//!
//! ```
//! use fixedlen_rs::{FieldDef, FieldKind, FixedLengthFormat, LayoutDef, ModelRegistry, RecordDef, Value};
//!
//! // Record layout: Last(8) First(10) Salary(8)
//! let mut registry = ModelRegistry::new();
//! registry
//!     .register(
//!         RecordDef::new("Employee")
//!             .field(FieldDef::new("last", 1).length(8).trim(true))
//!             .field(FieldDef::new("first", 9).length(10).trim(true))
//!             .field(FieldDef::new("salary", 19).length(8).kind(FieldKind::Long))
//!             .layout(LayoutDef::new().length(26)),
//!     )
//!     .unwrap();
//!
//! let format = FixedLengthFormat::new(&registry, "Employee").unwrap();
//! let result = format
//!     .unmarshal_str("SMITH   JOHN      00050000\nJONES   MARY      00075000\n")
//!     .unwrap();
//!
//! assert_eq!(result.entries.len(), 2);
//! assert_eq!(result.entries[1].root().text("first"), Some("MARY"));
//! assert_eq!(result.entries[0].root().get("salary"), Some(&Value::Long(50000)));
//! ```

pub mod binder;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod instance;
pub mod layout;
pub mod linker;
pub mod loader;
pub mod marshal;
pub mod model;
pub mod schema;
pub mod unmarshal;
pub mod value;

pub use binder::{BindStats, RecordBinder, trim_padding};
pub use config::{TransformRegistry, load_model, load_model_file};
pub use descriptor::{Extent, FieldDescriptor, FieldDescriptorTable};
pub use error::{BindError, FormatError, Result};
pub use format::{DefaultConverter, FormatConverter, FormattingOptions};
pub use instance::{Instance, InstanceGraph, Record, TypeKey};
pub use layout::RecordLayout;
pub use linker::link;
pub use loader::discover;
pub use marshal::write_record;
pub use model::{Align, FieldDef, LayoutDef, ModelRegistry, RecordDef, Transform};
pub use schema::RecordSchema;
pub use unmarshal::{BindResult, FixedLengthFormat, FromRecord, TypedResult};
pub use value::{FieldKind, Value};
