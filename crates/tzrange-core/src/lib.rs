//! # tzrange-core
//!
//! A compiler for the IANA Time Zone Database and a query layer over
//! the compiled result.
//!
//! The library ingests a tzdb release archive (the `.tar.gz` exactly as
//! distributed, handed over as an in-memory buffer) and reduces the
//! textual `Rule`/`Zone`/`Link` declarations to one sorted table of
//! time ranges per zone. Against that table it answers UTC↔wall-clock
//! conversions, classifying wall times that never happened (clocks
//! wound forward) or happened twice (clocks wound back).
//!
//! ## Features
//!
//! - **Self-contained ingestion**: gzip/DEFLATE decoding, tar member
//!   lookup and zic-source parsing with no file I/O.
//! - **Compact model**: per zone, a sorted `[since, offset,
//!   abbreviation]` table covering all of time; aliases share their
//!   main zone's table.
//! - **Total conversions**: `utc_from_wall` never fails, it classifies
//!   (`Ok` / `Ambiguous` / `Invalid`) with both candidate instants and
//!   a closest-valid fallback.
//! - **Country lookups**: ISO 3166 table with per-country default
//!   zones, caller-injectable aliases and default-zone overrides.
//!
//! ## Example
//!
//! ```no_run
//! use tzrange_core::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = std::fs::read("tzdata2025a.tar.gz")?;
//! let db = compile(&archive)?;
//!
//! let berlin = db.zone("Europe/Berlin");
//! let wall = wall_from_utc(berlin, 1_616_893_200);
//!
//! let conversion = utc_from_wall(berlin, wall);
//! assert_eq!(conversion.status, ConversionStatus::Ok);
//! assert_eq!(conversion.earlier, 1_616_893_200);
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod compile;
pub mod error;
pub mod models;
pub mod query;

mod inflate;
mod parse;
mod scan;
mod tar;

// Re-export commonly used items at the crate root
pub use calendar::{BEGIN_OF_TIME, Date, END_OF_TIME, Instant, date_from_instant, instant_from_date};
pub use compile::{compile, compile_with};
pub use error::{Result, TzRangeError};
pub use models::{
    CompileOptions, Conversion, ConversionStatus, Country, CountryAlias, DateKind,
    DefaultZoneOverride, TimeRange, Timezone, TimezoneDb,
};
pub use query::{utc_from_wall, wall_from_utc};

/// Prelude module for convenient imports.
///
/// ```
/// use tzrange_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::calendar::{BEGIN_OF_TIME, END_OF_TIME, Instant};
    pub use crate::compile::{compile, compile_with};
    pub use crate::error::{Result, TzRangeError};
    pub use crate::models::*;
    pub use crate::query::{utc_from_wall, wall_from_utc};
}
