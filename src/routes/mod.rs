/// Router Module Index
///
/// Routes are split by access level so the gates are applied once per module, as
/// layers, rather than checked inside handlers.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the token gate and the teacher role gate.
pub mod teacher;
