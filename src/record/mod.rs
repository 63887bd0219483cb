//! Write-path value handling: type coercion of editor input and removal of
//! values the store cannot represent.

mod normalize;
mod sanitize;

pub use normalize::{default_for, normalize, normalize_form};
pub use sanitize::{sanitize, sanitize_map};
