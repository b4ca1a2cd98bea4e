//! Command handlers invoked by the CLI dispatcher.

mod run;
mod validate;

pub(crate) use run::handle_run;
pub(crate) use validate::handle_validate;
