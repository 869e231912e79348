mod approve;
mod proposal;
mod save;

pub use approve::approve_route;
pub use proposal::save_proposal;
pub use save::{first_letter, generate_route_key, save_route};
