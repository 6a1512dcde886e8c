pub mod critique;
pub mod itinerary;
pub mod poi;
pub mod skeleton;
pub mod trip;
