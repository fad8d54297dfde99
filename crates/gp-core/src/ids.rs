//! Identifier types shared across the engine graph.

/// Gas-path station number as declared by the user when assembling an
/// engine (0 ambient, 2 post-inlet, 3 post-compressor, ...).
///
/// Stations are arbitrary small integers chosen by the model author and
/// key the shared station table; they are not dense indices.
pub type Station = u32;

/// Shaft number tying together the turbo components that share a spool.
/// The first component referencing a number creates the shaft.
pub type ShaftNr = u32;
