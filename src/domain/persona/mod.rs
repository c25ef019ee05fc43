pub mod model;
pub mod resolver;

pub use model::Persona;
pub use resolver::PersonaResolver;
