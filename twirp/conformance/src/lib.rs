//! Generated Twirp code, compiled and run.
//!
//! `build.rs` generates `greeter.rpc.rs` with the plugin library. The file is
//! included into [`pb`] next to hand-written `prost` messages and runs on the
//! small in-process runtime in [`util`]. The tests under `tests/` drive the
//! generated server and clients through that runtime.

pub mod pb;
pub mod util;
