//! Test Fixtures Module
//!
//! Generated audio and fake collaborators shared by the integration tests.

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;
pub mod fakes;

pub use audio_fixtures::*;
pub use fakes::*;
