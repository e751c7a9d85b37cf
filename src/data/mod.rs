/// Data layer: core types, format parsers, and dispatch.
///
/// Architecture:
/// ```text
///  .mpt / .mpr / .dta / delimited text
///        │
///        ▼
///   ┌────────────┐
///   │  registry   │  first claiming parser that succeeds wins
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ ParsedData  │  columns + numeric rows, metadata, units
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ technique   │  classify experiment, infer column units
///   └────────────┘
/// ```

pub mod biologic;
pub mod gamry;
pub mod generic;
pub mod model;
pub mod registry;
pub mod technique;

pub use model::{DataTable, FileInput, ParsedData, Technique};
pub use registry::{FormatParser, ParserRegistry};
