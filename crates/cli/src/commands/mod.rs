pub(crate) mod calc;
pub(crate) mod check;
pub(crate) mod state;
pub(crate) mod submit;
pub(crate) mod validate;
