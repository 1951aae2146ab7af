//! One function per subcommand. Each calls into the workflow engine and
//! renders what the report adds on top of the engine's own narration.

/// `gitext cleanup`.
mod cleanup;
/// `gitext prepare pr`.
mod prepare;
/// `gitext retarget feature`.
mod retarget;
/// `gitext start feature`.
mod start;
/// `gitext status`.
mod status;
/// `gitext sync`.
mod sync;
/// `gitext update feature`.
mod update;

pub use cleanup::cleanup;
pub use prepare::prepare_pr;
pub use retarget::retarget;
pub use start::start;
pub use status::status;
pub use sync::sync;
pub use update::update;
