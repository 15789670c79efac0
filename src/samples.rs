// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Sample-backed piano voices.
//!
//! This module provides:
//! - The catalog of recorded samples and their file names
//! - Resolution of any pitch to the closest loaded sample
//! - The choice between a transposed sample and synthesis
//! - Voice envelopes and the two-phase stop
//! - Concurrent loading of the catalog
//! - The note on/note off boundary

pub mod catalog;
pub mod engine;
pub mod envelope;
pub mod loader;
pub mod policy;
pub mod resolver;
pub mod synth;
pub mod voice;

pub use engine::NoteEngine;
pub use loader::{SampleBank, SampleLoader};
pub use synth::Synthesizer;
pub use voice::Voice;
