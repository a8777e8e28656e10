//! flatscan-io: filesystem side of flatscan.
//!
//! Loads precomputed boundary masks, writes diagnostic images and the
//! result overlay, and builds the persistence record the database layer
//! stores.

#![warn(missing_docs)]

pub mod predictor;
pub mod record;
pub mod sink;

pub use predictor::{MaskFilePredictor, MaskLoadError};
pub use record::{InspectionRecord, PanelRecord};
pub use sink::{DiagnosticSink, DirectorySink, MemorySink, SinkError, WriteOptions, write_inspection};
