//! Profiling utilities based on the `puffin` crate.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Enable puffin scope collection. Off by default; a viewer must be attached
/// separately to consume the data.
pub fn enable() {
    puffin::set_scopes_on(true);
    tracing::info!("Profiling scopes enabled, attach a puffin viewer to consume them");
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame in your main loop to organize profiling data by frame.
#[inline]
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}
