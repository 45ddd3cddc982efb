pub mod game;
pub mod participant;
pub mod question;
pub mod user;
