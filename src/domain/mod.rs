mod currency;
mod entity;
mod lease;
mod ledger;
mod site;
mod tenant;
mod term;

pub use currency::*;
pub use entity::*;
pub use lease::*;
pub use ledger::*;
pub use site::*;
pub use tenant::*;
pub use term::*;
