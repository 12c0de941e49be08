pub mod showtime;

pub use showtime::{CatalogError, InMemoryShowtimeCatalog, Showtime, ShowtimeCatalog};
