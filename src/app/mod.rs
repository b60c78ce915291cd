// Application layer - Use case interactors

pub mod circle_interactor;
pub mod container;
pub mod messages;

// Re-export interactors
pub use circle_interactor::{CircleInteractor, InteractorSettings};
pub use container::{AppContainer, DefaultAppContainer};
