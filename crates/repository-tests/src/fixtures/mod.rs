//! Customer / Order / Shipment / Address models and their repositories.
//!
//! The models reference each other cyclically (a customer has orders, an
//! order belongs to a customer, a customer has child customers), so their
//! definitions are resolved through a shared set of cells filled once every
//! definition is built.

mod models;
mod repositories;

pub use {models::*, repositories::*};
