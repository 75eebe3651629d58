/// Clip placement inside a target surface.
pub mod fit;
/// Offscreen RGBA surfaces and frame image encoding.
pub mod surface;
/// Interactive render target boundary.
pub mod target;
