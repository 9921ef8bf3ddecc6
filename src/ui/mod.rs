pub mod ribbon;

pub use ribbon::ribbon;
