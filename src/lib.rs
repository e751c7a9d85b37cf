//! Parsing and numerical analysis core for electrochemistry instrument
//! exports.
//!
//! The crate has two halves:
//!
//! * [`data`] — format parsers for instrument export files (BioLogic
//!   EC-Lab, Gamry, generic delimited text) behind an ordered
//!   [`data::registry::ParserRegistry`], all producing the uniform
//!   [`data::model::ParsedData`] table.
//! * [`analysis`] — stateless numerics over columns extracted from a
//!   parsed table: least-squares fitting, descriptive statistics, peak
//!   detection, and a direct Fourier pipeline (windowing, PSD,
//!   frequency-domain filtering, SNR).
//!
//! Everything here is synchronous and pure: functions read their
//! arguments and return new values, so concurrent use needs no
//! coordination. Persistence, rendering and transport are collaborator
//! concerns and never happen in this crate.

pub mod analysis;
pub mod data;
pub mod error;

pub use error::CoreError;
