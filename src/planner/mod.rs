//! Trip planning logic: the editable trip form and the pure calculations the
//! trip views display.

pub mod batch;
pub mod form;
pub mod progress;
pub mod status;
pub mod store;
