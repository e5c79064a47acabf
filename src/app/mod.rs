//! Process-level plumbing shared by the library and the `blowout` binary.

pub(crate) mod logging;
