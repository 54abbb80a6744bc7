pub mod confirmation;

pub use confirmation::Confirmation;
